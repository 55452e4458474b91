//! Transaction helpers.
//!
//! Pass a transaction (`tokio_postgres::Transaction` or
//! `deadpool_postgres::Transaction`) to any operation that accepts a
//! [`GenericClient`](crate::GenericClient); mappers and queries do not care
//! whether they run inside one.
//!
//! Use [`begin`] to start a transaction with options under a [`Context`], or
//! the [`transaction!`](crate::transaction) macro for scoped commit/rollback:
//!
//! ```ignore
//! use pgmap::{ColumnSelection, Context, OrmResult};
//!
//! let ctx = Context::background();
//! pgmap::transaction!(&mut client, tx, {
//!     books.insert(&ctx, &tx, &mut book, ColumnSelection::Infer).await?;
//!     assert_eq!(books.query().count(&ctx, &tx).await?, 1);
//!     Ok(())
//! })?;
//! ```

use crate::context::Context;
use crate::error::OrmResult;

/// Runs the given block inside a database transaction.
///
/// - Begins a transaction via `$client.transaction().await`.
/// - Commits on `Ok(_)`.
/// - Rolls back on `Err(_)`, including errors raised by hooks and mapping.
///
/// The block must evaluate to `pgmap::OrmResult<T>`.
#[macro_export]
macro_rules! transaction {
    ($client:expr, $tx:ident, $body:block) => {{
        let $tx = ($client)
            .transaction()
            .await
            .map_err($crate::OrmError::from)?;

        let __pgmap_tx_body_result = async { $body }.await;
        match __pgmap_tx_body_result {
            Ok(value) => {
                $tx.commit().await.map_err($crate::OrmError::from)?;
                Ok(value)
            }
            Err(error) => {
                $crate::__private::tracing::debug!(
                    target: "pgmap.tx",
                    error = %error,
                    "rolling back transaction"
                );
                match $tx.rollback().await {
                    Ok(()) => Err(error),
                    Err(rollback_err) => Err($crate::OrmError::Other(format!(
                        "{error} (rollback failed: {rollback_err})"
                    ))),
                }
            }
        }
    }};
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl From<IsolationLevel> for tokio_postgres::IsolationLevel {
    fn from(level: IsolationLevel) -> Self {
        match level {
            IsolationLevel::ReadUncommitted => tokio_postgres::IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted => tokio_postgres::IsolationLevel::ReadCommitted,
            IsolationLevel::RepeatableRead => tokio_postgres::IsolationLevel::RepeatableRead,
            IsolationLevel::Serializable => tokio_postgres::IsolationLevel::Serializable,
        }
    }
}

/// Options for [`begin`]. The default starts a plain read-write transaction
/// at the server's default isolation level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
    pub deferrable: bool,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Only meaningful for serializable read-only transactions.
    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.deferrable = deferrable;
        self
    }
}

/// Start a transaction on `client`.
///
/// The returned transaction rolls back when dropped without `commit()`.
pub async fn begin<'a>(
    ctx: &Context,
    client: &'a mut tokio_postgres::Client,
    opts: TransactionOptions,
) -> OrmResult<tokio_postgres::Transaction<'a>> {
    let cancel_token = client.cancel_token();
    let mut builder = client
        .build_transaction()
        .read_only(opts.read_only)
        .deferrable(opts.deferrable);
    if let Some(level) = opts.isolation {
        builder = builder.isolation_level(level.into());
    }
    tracing::debug!(target: "pgmap.tx", ?opts, "begin");
    ctx.run(Some(cancel_token), async move {
        Ok(builder.start().await?)
    })
    .await
}
