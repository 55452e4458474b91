//! Generic client trait for unified database access.

use crate::error::OrmResult;
use crate::row::Row;
use crate::value::Value;
use std::future::Future;
use std::pin::Pin;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// Every mapper and query operation is generic over this trait, so the same
/// call runs against a direct connection, a pooled connection or an open
/// transaction.
pub trait GenericClient: Send + Sync {
    /// Execute a statement and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Return a cancellation token for the underlying connection, if supported.
    ///
    /// Used to cancel the in-flight statement server-side when a context is
    /// cancelled or its deadline passes.
    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        None
    }
}

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe view of a [`GenericClient`].
///
/// Relations are stored as trait objects and cannot be generic over the
/// client type, so they execute through this adapter instead.
pub trait DynClient: Send + Sync {
    fn query_dyn<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, OrmResult<Vec<Row>>>;

    fn execute_dyn<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, OrmResult<u64>>;

    fn cancel_token_dyn(&self) -> Option<tokio_postgres::CancelToken>;
}

impl<C: GenericClient> DynClient for C {
    fn query_dyn<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, OrmResult<Vec<Row>>> {
        Box::pin(self.query(sql, params))
    }

    fn execute_dyn<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [Value],
    ) -> BoxFuture<'a, OrmResult<u64>> {
        Box::pin(self.execute(sql, params))
    }

    fn cancel_token_dyn(&self) -> Option<tokio_postgres::CancelToken> {
        self.cancel_token()
    }
}

fn sql_params(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

impl<C: GenericClient> GenericClient for &C {
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        (**self).cancel_token()
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let params = sql_params(params);
        let rows = tokio_postgres::Client::query(self, sql, &params).await?;
        Row::from_pg_rows(&rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let params = sql_params(params);
        Ok(tokio_postgres::Client::execute(self, sql, &params).await?)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Client::cancel_token(self))
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        let params = sql_params(params);
        let rows = tokio_postgres::Transaction::query(self, sql, &params).await?;
        Row::from_pg_rows(&rows)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let params = sql_params(params);
        Ok(tokio_postgres::Transaction::execute(self, sql, &params).await?)
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        Some(tokio_postgres::Transaction::cancel_token(self))
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper -> tokio_postgres::Client).
        GenericClient::query(&***self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        GenericClient::execute(&***self, sql, params).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        GenericClient::cancel_token(&***self)
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<Row>> {
        GenericClient::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        GenericClient::execute(&**self, sql, params).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        GenericClient::cancel_token(&**self)
    }
}
