//! Typed SELECT / bulk mutation builder for one entity type.

use super::ColumnValues;
use super::expr::{Expr, ExprGroup};
use crate::client::GenericClient;
use crate::context::Context;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::exec;
use crate::hooks::{HookEvent, Hooks};
use crate::ident::validate_order_by;
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// Query over the table of `E`.
///
/// Modifiers consume and return the builder; terminal operations consume it,
/// so a query runs at most once. Errors from modifiers (invalid ORDER BY,
/// unknown relation, placeholder mismatch) surface as
/// [`OrmError::MalformedQuery`] when a terminal operation runs, before any
/// round trip.
///
/// ```ignore
/// let books = books_mapper
///     .query()
///     .filter("title LIKE ? OR author LIKE ?", ["%Go%", "%Go%"])
///     .order_by("title ASC")
///     .limit(5)
///     .all(&ctx, &client)
///     .await?;
/// ```
#[must_use = "queries do nothing until a terminal operation runs"]
pub struct Query<E: Entity> {
    hooks: Arc<Hooks<E>>,
    filters: ExprGroup,
    order_by: Vec<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    loads: Vec<String>,
    build_error: Option<String>,
}

impl<E: Entity> Default for Query<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Query<E> {
    /// An unfiltered query without hooks.
    pub fn new() -> Self {
        Self::with_hooks(Arc::new(Hooks::new()))
    }

    /// An unfiltered query that runs `hooks` on selected entities.
    pub fn with_hooks(hooks: Arc<Hooks<E>>) -> Self {
        Self {
            hooks,
            filters: ExprGroup::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            loads: Vec::new(),
            build_error: None,
        }
    }

    /// Replace the hook registry used for after-select hooks.
    pub fn hooks(mut self, hooks: Arc<Hooks<E>>) -> Self {
        self.hooks = hooks;
        self
    }

    fn fail(&mut self, message: String) {
        if self.build_error.is_none() {
            self.build_error = Some(message);
        }
    }

    /// A query that fails with `err` when it runs.
    pub(crate) fn poisoned(mut self, err: OrmError) -> Self {
        match err {
            OrmError::MalformedQuery(message) => self.fail(message),
            other => self.fail(other.to_string()),
        }
        self
    }

    // ==================== Modifiers ====================

    /// Add a predicate with `?` placeholders. Multiple calls combine with AND.
    pub fn filter<I, V>(mut self, predicate: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.filters.push(Expr::template(predicate, args));
        self
    }

    /// Add a predicate that takes no arguments.
    pub fn filter_sql(self, predicate: impl Into<String>) -> Self {
        self.filter(predicate, Vec::<Value>::new())
    }

    /// `column = value`
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Expr::eq(column, value));
        self
    }

    /// `column IS NULL`
    pub fn is_null(mut self, column: &str) -> Self {
        self.filters.push(Expr::is_null(column));
        self
    }

    /// `column IN (...)`; an empty list matches nothing.
    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Expr::in_list(column, values));
        self
    }

    /// Append an ORDER BY item list such as `"title ASC"`.
    pub fn order_by(mut self, clause: &str) -> Self {
        match validate_order_by(clause) {
            Ok(()) => self.order_by.push(clause.trim().to_string()),
            Err(OrmError::MalformedQuery(message)) => self.fail(message),
            Err(e) => self.fail(e.to_string()),
        }
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        if n < 0 {
            self.fail(format!("negative LIMIT {n}"));
        }
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        if n < 0 {
            self.fail(format!("negative OFFSET {n}"));
        }
        self.offset = Some(n);
        self
    }

    /// Eager-load a relation of `E` by name after the main query.
    pub fn load(mut self, relation: &str) -> Self {
        if E::relation(relation).is_none() {
            self.fail(format!(
                "{} has no relation named '{relation}'",
                E::table()
            ));
        }
        self.loads.push(relation.to_string());
        self
    }

    // ==================== SQL ====================

    fn check(&self) -> OrmResult<()> {
        match &self.build_error {
            Some(message) => Err(OrmError::MalformedQuery(message.clone())),
            None => Ok(()),
        }
    }

    fn build_where(&self, params: &mut Vec<Value>) -> OrmResult<String> {
        self.check()?;
        self.filters.build_where(params)
    }

    fn build_tail(&self, sql: &mut String) {
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    /// The SELECT statement and its parameters.
    pub fn to_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let schema = E::schema();
        let mut params = Vec::new();
        let mut sql = format!("SELECT {} FROM {}", schema.select_list(), schema.table);
        sql.push_str(&self.build_where(&mut params)?);
        self.build_tail(&mut sql);
        Ok((sql, params))
    }

    pub fn to_count_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", E::table());
        sql.push_str(&self.build_where(&mut params)?);
        Ok((sql, params))
    }

    fn to_exists_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        let mut params = Vec::new();
        let mut sql = format!("SELECT EXISTS (SELECT 1 FROM {}", E::table());
        sql.push_str(&self.build_where(&mut params)?);
        self.build_tail(&mut sql);
        sql.push(')');
        Ok((sql, params))
    }

    fn reject_paging(&self, op: &str) -> OrmResult<()> {
        if self.limit.is_some() || self.offset.is_some() || !self.order_by.is_empty() {
            return Err(OrmError::malformed(format!(
                "{op} does not support ORDER BY, LIMIT or OFFSET"
            )));
        }
        if !self.loads.is_empty() {
            return Err(OrmError::malformed(format!("{op} does not support eager loads")));
        }
        Ok(())
    }

    fn to_delete_sql(&self) -> OrmResult<(String, Vec<Value>)> {
        self.reject_paging("delete_all")?;
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", E::table());
        sql.push_str(&self.build_where(&mut params)?);
        Ok((sql, params))
    }

    fn to_update_sql(&self, values: &ColumnValues) -> OrmResult<(String, Vec<Value>)> {
        self.reject_paging("update_all")?;
        let mut params = Vec::new();
        let set = values.build_set::<E>(&mut params)?;
        let mut sql = format!("UPDATE {} SET {}", E::table(), set);
        sql.push_str(&self.build_where(&mut params)?);
        Ok((sql, params))
    }

    // ==================== Terminal operations ====================

    /// Every matching row, after-select hooks applied and relations loaded.
    pub async fn all(self, ctx: &Context, conn: &impl GenericClient) -> OrmResult<Vec<E>> {
        let (sql, params) = self.to_sql()?;
        let rows = exec::fetch(ctx, conn, &sql, &params).await?;
        let mut entities = rows.iter().map(E::from_row).collect::<OrmResult<Vec<_>>>()?;

        self.hooks
            .run_all(HookEvent::AfterSelect, ctx, &mut entities)?;

        for name in &self.loads {
            let relation = E::relation(name)
                .ok_or_else(|| OrmError::malformed(format!("unknown relation '{name}'")))?;
            relation.load(ctx, conn, &mut entities).await?;
        }
        Ok(entities)
    }

    /// The first matching row; `NotFound` when nothing matches.
    ///
    /// Adds `LIMIT 1`. When the filter could match several rows the first
    /// one in query order wins.
    pub async fn one(mut self, ctx: &Context, conn: &impl GenericClient) -> OrmResult<E> {
        self.limit = Some(1);
        let table = E::table();
        self.all(ctx, conn)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::not_found(format!("no matching row in {table}")))
    }

    pub async fn count(self, ctx: &Context, conn: &impl GenericClient) -> OrmResult<i64> {
        let (sql, params) = self.to_count_sql()?;
        let rows = exec::fetch(ctx, conn, &sql, &params).await?;
        scalar(&rows)
    }

    pub async fn exists(self, ctx: &Context, conn: &impl GenericClient) -> OrmResult<bool> {
        let (sql, params) = self.to_exists_sql()?;
        let rows = exec::fetch(ctx, conn, &sql, &params).await?;
        scalar(&rows)
    }

    /// Delete every matching row. Hooks do not run.
    pub async fn delete_all(self, ctx: &Context, conn: &impl GenericClient) -> OrmResult<u64> {
        let (sql, params) = self.to_delete_sql()?;
        exec::execute(ctx, conn, &sql, &params).await
    }

    /// Apply `values` to every matching row. Hooks do not run.
    pub async fn update_all(
        self,
        ctx: &Context,
        conn: &impl GenericClient,
        values: ColumnValues,
    ) -> OrmResult<u64> {
        let (sql, params) = self.to_update_sql(&values)?;
        exec::execute(ctx, conn, &sql, &params).await
    }
}

/// First column of the first row.
fn scalar<T: FromValue>(rows: &[crate::row::Row]) -> OrmResult<T> {
    let value = rows
        .first()
        .and_then(|r| r.get_idx(0))
        .cloned()
        .ok_or_else(|| OrmError::decode("?column?", "scalar query returned no rows"))?;
    T::from_value(value).map_err(|m| OrmError::decode("?column?", m))
}
