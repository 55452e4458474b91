//! Entity persistence.
//!
//! A [`Mapper`] writes and re-reads entities of one type and owns the hook
//! registry for that type. Mappers are cheap to clone; clones share hooks.
//!
//! ```ignore
//! use pgmap::{ColumnSelection, Context, Mapper};
//!
//! let books = Mapper::<Book>::new();
//! let ctx = Context::background();
//!
//! let mut book = Book {
//!     title: "Sample Book".into(),
//!     author: "John Doe".into(),
//!     ..Default::default()
//! };
//! books.insert(&ctx, &client, &mut book, ColumnSelection::Infer).await?;
//! assert!(book.id > 0);
//! ```

mod columns;
mod statements;
mod upsert;

pub use columns::ColumnSelection;
pub use upsert::UpsertOptions;

use crate::client::GenericClient;
use crate::context::Context;
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::exec;
use crate::hooks::{HookEvent, Hooks};
use crate::qb::{ColumnValues, Query};
use crate::row::Row;
use crate::value::Value;
use columns::{insert_columns, update_columns};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Persistence operations for `E`, with `E`'s lifecycle hooks.
pub struct Mapper<E: Entity> {
    hooks: Arc<Hooks<E>>,
}

impl<E: Entity> Clone for Mapper<E> {
    fn clone(&self) -> Self {
        Self {
            hooks: Arc::clone(&self.hooks),
        }
    }
}

impl<E: Entity> Default for Mapper<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> fmt::Debug for Mapper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("table", &E::table())
            .field("hooks", &self.hooks)
            .finish()
    }
}

fn values_of<E: Entity>(entity: &E, columns: &[&str]) -> OrmResult<Vec<Value>> {
    columns.iter().map(|c| entity.column_value(c)).collect()
}

fn primary_key<E: Entity>() -> OrmResult<&'static [&'static str]> {
    let pk = E::schema().primary_key;
    if pk.is_empty() {
        return Err(OrmError::malformed(format!(
            "{} has no primary key",
            E::table()
        )));
    }
    Ok(pk)
}

/// Primary keys of `entities`, first occurrence order, without repeats.
fn distinct_keys<E: Entity>(entities: &[E]) -> OrmResult<Vec<Vec<Value>>> {
    let mut seen = HashSet::with_capacity(entities.len());
    let mut keys = Vec::with_capacity(entities.len());
    for entity in entities {
        let key = entity.primary_key_values()?;
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn row_key(row: &Row, pk: &[&str]) -> OrmResult<Vec<Value>> {
    pk.iter()
        .map(|c| {
            row.get(c)
                .cloned()
                .ok_or_else(|| OrmError::decode(*c, "key column not present in row"))
        })
        .collect()
}

fn check_count(expected: usize, actual: u64) -> OrmResult<()> {
    let expected = expected as u64;
    if expected != actual {
        return Err(OrmError::PartialFailure { expected, actual });
    }
    Ok(())
}

impl<E: Entity> Mapper<E> {
    /// A mapper with no hooks.
    pub fn new() -> Self {
        Self::with_hooks(Hooks::new())
    }

    pub fn with_hooks(hooks: Hooks<E>) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Hooks<E> {
        &self.hooks
    }

    /// A query over `E` that runs this mapper's after-select hooks.
    pub fn query(&self) -> Query<E> {
        Query::with_hooks(Arc::clone(&self.hooks))
    }

    // ==================== Single entity ====================

    /// Insert `entity`, then write store-generated defaults back onto it.
    pub async fn insert(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entity: &mut E,
        selection: ColumnSelection,
    ) -> OrmResult<()> {
        self.hooks.run(HookEvent::BeforeInsert, ctx, entity)?;

        let columns = insert_columns::<E>(&selection, entity)?;
        let params = values_of(entity, &columns.insert)?;
        let sql = statements::insert_sql(E::table(), &columns.insert, &columns.returning);

        if columns.returning.is_empty() {
            exec::execute(ctx, conn, &sql, &params).await?;
        } else {
            let rows = exec::fetch(ctx, conn, &sql, &params).await?;
            let row = rows.first().ok_or_else(|| {
                OrmError::InconsistentState(format!("insert into {} returned no row", E::table()))
            })?;
            entity.apply_row(row)?;
        }

        self.hooks.run(HookEvent::AfterInsert, ctx, entity)
    }

    /// Update `entity` by primary key. Returns 0 when the row no longer exists.
    pub async fn update(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entity: &mut E,
        selection: ColumnSelection,
    ) -> OrmResult<u64> {
        self.hooks.run(HookEvent::BeforeUpdate, ctx, entity)?;

        let pk = primary_key::<E>()?;
        let set = update_columns::<E>(&selection)?;
        let mut params = values_of(entity, &set)?;
        params.extend(entity.primary_key_values()?);
        let sql = statements::update_sql(E::table(), &set, pk);

        let n = exec::execute(ctx, conn, &sql, &params).await?;
        if n > 1 {
            return Err(OrmError::InconsistentState(format!(
                "update of one {} row affected {n} rows",
                E::table()
            )));
        }

        self.hooks.run(HookEvent::AfterUpdate, ctx, entity)?;
        Ok(n)
    }

    /// Insert `entity` or resolve the conflict per `opts`, in one statement.
    ///
    /// Returns 1 when a row was inserted or updated and 0 when the conflict
    /// left the existing row untouched; in that case `entity` keeps its
    /// values.
    pub async fn upsert(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entity: &mut E,
        opts: UpsertOptions,
    ) -> OrmResult<u64> {
        self.hooks.run(HookEvent::BeforeUpsert, ctx, entity)?;

        let plan = opts.plan(entity)?;
        let params = values_of(entity, &plan.insert)?;
        let sql = statements::upsert_sql(
            E::table(),
            &plan.insert,
            &plan.conflict,
            plan.update.as_deref(),
            &plan.returning,
        );

        let n = if plan.returning.is_empty() {
            exec::execute(ctx, conn, &sql, &params).await?
        } else {
            let rows = exec::fetch(ctx, conn, &sql, &params).await?;
            if let Some(row) = rows.first() {
                entity.apply_row(row)?;
            }
            rows.len() as u64
        };

        self.hooks.run(HookEvent::AfterUpsert, ctx, entity)?;
        Ok(n)
    }

    /// Delete `entity` by primary key. Returns 0 when the row was already gone.
    pub async fn delete(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entity: &mut E,
    ) -> OrmResult<u64> {
        self.hooks.run(HookEvent::BeforeDelete, ctx, entity)?;

        let pk = primary_key::<E>()?;
        let params = entity.primary_key_values()?;
        let sql = statements::delete_sql(E::table(), pk);

        let n = exec::execute(ctx, conn, &sql, &params).await?;
        if n > 1 {
            return Err(OrmError::InconsistentState(format!(
                "delete of one {} row affected {n} rows",
                E::table()
            )));
        }

        self.hooks.run(HookEvent::AfterDelete, ctx, entity)?;
        Ok(n)
    }

    /// Overwrite every column field of `entity` with the stored row.
    ///
    /// Relation slots are left as they are. No hooks run.
    pub async fn reload(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entity: &mut E,
    ) -> OrmResult<()> {
        let schema = E::schema();
        let pk = primary_key::<E>()?;
        let params = entity.primary_key_values()?;
        let sql = statements::select_by_key_sql(&schema.select_list(), schema.table, pk);

        let rows = exec::fetch(ctx, conn, &sql, &params).await?;
        let row = rows.first().ok_or_else(|| {
            OrmError::not_found(format!("{} row to reload no longer exists", schema.table))
        })?;
        entity.apply_row(row)
    }

    /// Fetch by a single-column primary key.
    pub async fn find(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        key: impl Into<Value>,
    ) -> OrmResult<E> {
        self.by_key(vec![key.into()])?.one(ctx, conn).await
    }

    /// Fetch by primary key values, in primary key column order.
    pub async fn find_by_key(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        key: Vec<Value>,
    ) -> OrmResult<E> {
        self.by_key(key)?.one(ctx, conn).await
    }

    pub async fn exists(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        key: impl Into<Value>,
    ) -> OrmResult<bool> {
        self.by_key(vec![key.into()])?.exists(ctx, conn).await
    }

    fn by_key(&self, key: Vec<Value>) -> OrmResult<Query<E>> {
        let pk = primary_key::<E>()?;
        if pk.len() != key.len() {
            return Err(OrmError::malformed(format!(
                "{} has {} primary key columns, got {} values",
                E::table(),
                pk.len(),
                key.len()
            )));
        }
        Ok(pk
            .iter()
            .zip(key)
            .fold(self.query(), |q, (column, value)| q.eq(column, value)))
    }

    // ==================== Slices ====================
    //
    // Each slice operation is one statement keyed by the distinct primary
    // keys of the slice. A row count other than the number of keys is
    // `PartialFailure`; the statement has run by then, so callers inside a
    // transaction should roll back.

    /// Delete exactly the rows of `entities`.
    ///
    /// Delete hooks run for every entity when any are registered.
    pub async fn delete_all(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entities: &mut [E],
    ) -> OrmResult<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        self.hooks.run_all(HookEvent::BeforeDelete, ctx, entities)?;

        let pk = primary_key::<E>()?;
        let keys = distinct_keys(entities)?;
        let mut params = Vec::new();
        let filter = statements::key_in(pk, &keys, &mut params);
        let sql = format!("DELETE FROM {} WHERE {}", E::table(), filter);

        let n = exec::execute(ctx, conn, &sql, &params).await?;
        check_count(keys.len(), n)?;

        self.hooks.run_all(HookEvent::AfterDelete, ctx, entities)?;
        Ok(n)
    }

    /// Re-read every entity of the slice with one query.
    pub async fn reload_all(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entities: &mut [E],
    ) -> OrmResult<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let schema = E::schema();
        let pk = primary_key::<E>()?;
        let keys = distinct_keys(entities)?;
        let mut params = Vec::new();
        let filter = statements::key_in(pk, &keys, &mut params);
        let sql = format!(
            "SELECT {} FROM {} WHERE {}",
            schema.select_list(),
            schema.table,
            filter
        );

        let rows = exec::fetch(ctx, conn, &sql, &params).await?;
        check_count(keys.len(), rows.len() as u64)?;

        let by_key = rows
            .iter()
            .map(|row| Ok((row_key(row, pk)?, row)))
            .collect::<OrmResult<HashMap<_, _>>>()?;
        for entity in entities.iter_mut() {
            let key = entity.primary_key_values()?;
            let row = by_key.get(&key).ok_or(OrmError::PartialFailure {
                expected: keys.len() as u64,
                actual: by_key.len() as u64,
            })?;
            entity.apply_row(row)?;
        }
        Ok(())
    }

    /// Apply `values` to exactly the rows of `entities`. Hooks do not run.
    pub async fn update_all(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        entities: &[E],
        values: ColumnValues,
    ) -> OrmResult<u64> {
        if entities.is_empty() {
            return Ok(0);
        }
        let pk = primary_key::<E>()?;
        let keys = distinct_keys(entities)?;
        let mut params = Vec::new();
        let set = values.build_set::<E>(&mut params)?;
        let filter = statements::key_in(pk, &keys, &mut params);
        let sql = format!("UPDATE {} SET {} WHERE {}", E::table(), set, filter);

        let n = exec::execute(ctx, conn, &sql, &params).await?;
        check_count(keys.len(), n)?;
        Ok(n)
    }
}
