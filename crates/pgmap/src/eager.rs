//! Relationship loading.
//!
//! A [`HasMany`] descriptor ties a parent key column to a child foreign-key
//! column and to the parent field that holds loaded children. It serves both
//! loading styles:
//!
//! - eager: `Query::load("FavoriteMovies")` runs exactly one extra query,
//!   `WHERE movies.user_id IN (...)`, for the whole parent result set;
//! - lazy: `user.select_favorite_movies()` builds a query for one parent.
//!
//! Loaded slots hold `Some(children)`, including `Some(vec![])` for parents
//! without children. `None` means the relation was never loaded.

use crate::client::{BoxFuture, DynClient, GenericClient};
use crate::context::Context;
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::exec;
use crate::mapper::{ColumnSelection, Mapper};
use crate::qb::Query;
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A relation of `P` that can be eager-loaded by name.
pub trait Relation<P>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Populate the relation slot of every parent with one extra round trip.
    fn load<'a>(
        &'a self,
        ctx: &'a Context,
        conn: &'a dyn DynClient,
        parents: &'a mut [P],
    ) -> BoxFuture<'a, OrmResult<()>>;
}

/// Parent `P` has many `C` through `C.foreign_key = P.local_key`.
pub struct HasMany<P, C> {
    name: &'static str,
    local_key: &'static str,
    foreign_key: &'static str,
    slot: fn(&mut P) -> &mut Option<Vec<C>>,
}

impl<P, C> HasMany<P, C> {
    pub const fn new(
        name: &'static str,
        local_key: &'static str,
        foreign_key: &'static str,
        slot: fn(&mut P) -> &mut Option<Vec<C>>,
    ) -> Self {
        Self {
            name,
            local_key,
            foreign_key,
            slot,
        }
    }

    pub fn local_key(&self) -> &'static str {
        self.local_key
    }

    pub fn foreign_key(&self) -> &'static str {
        self.foreign_key
    }
}

impl<P, C> fmt::Debug for HasMany<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasMany")
            .field("name", &self.name)
            .field("local_key", &self.local_key)
            .field("foreign_key", &self.foreign_key)
            .finish()
    }
}

impl<P: Entity, C: Entity + Clone> HasMany<P, C> {
    /// Children of one parent, as a query that can be refined further.
    ///
    /// Independent of any eager load already stored on `parent`.
    pub fn query_for(&self, parent: &P) -> Query<C> {
        match parent.column_value(self.local_key) {
            Ok(key) => Query::new().eq(self.foreign_key, key),
            Err(e) => Query::new().poisoned(e),
        }
    }

    /// Point each child at `parent`, persist it, and append it to the
    /// parent's slot.
    ///
    /// With `insert` the children are inserted; otherwise only their
    /// foreign-key column is updated. Children are appended as soon as they
    /// are persisted, so on error the slot holds every child written before
    /// the failing one.
    pub async fn add(
        &self,
        ctx: &Context,
        conn: &impl GenericClient,
        children_mapper: &Mapper<C>,
        parent: &mut P,
        children: Vec<C>,
        insert: bool,
    ) -> OrmResult<()> {
        let key = parent.column_value(self.local_key)?;
        for mut child in children {
            child.set_column_value(self.foreign_key, key.clone())?;
            if insert {
                children_mapper
                    .insert(ctx, conn, &mut child, ColumnSelection::Infer)
                    .await?;
            } else {
                let n = children_mapper
                    .update(
                        ctx,
                        conn,
                        &mut child,
                        ColumnSelection::explicit([self.foreign_key]),
                    )
                    .await?;
                if n == 0 {
                    return Err(crate::error::OrmError::not_found(format!(
                        "{} row to attach no longer exists",
                        C::table()
                    )));
                }
            }
            (self.slot)(parent).get_or_insert_with(Vec::new).push(child);
        }
        Ok(())
    }

    async fn load_into(
        &self,
        ctx: &Context,
        conn: &dyn DynClient,
        parents: &mut [P],
    ) -> OrmResult<()> {
        if parents.is_empty() {
            return Ok(());
        }

        let mut seen = HashSet::with_capacity(parents.len());
        let mut keys = Vec::with_capacity(parents.len());
        for parent in parents.iter() {
            let key = parent.column_value(self.local_key)?;
            if !key.is_null() && seen.insert(key.clone()) {
                keys.push(key);
            }
        }

        let mut grouped: HashMap<Value, Vec<C>> = HashMap::new();
        if !keys.is_empty() {
            let (sql, params) = Query::<C>::new()
                .in_list(self.foreign_key, keys)
                .to_sql()?;
            let rows = exec::fetch(ctx, conn, &sql, &params).await?;
            for row in &rows {
                let child = C::from_row(row)?;
                let fk = child.column_value(self.foreign_key)?;
                grouped.entry(fk).or_default().push(child);
            }
        }

        tracing::debug!(
            target: "pgmap.eager",
            relation = self.name,
            parents = parents.len(),
            groups = grouped.len(),
            "eager loaded"
        );

        for parent in parents.iter_mut() {
            let key = parent.column_value(self.local_key)?;
            *(self.slot)(parent) = Some(grouped.get(&key).cloned().unwrap_or_default());
        }
        Ok(())
    }
}

impl<P: Entity, C: Entity + Clone> Relation<P> for HasMany<P, C> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn load<'a>(
        &'a self,
        ctx: &'a Context,
        conn: &'a dyn DynClient,
        parents: &'a mut [P],
    ) -> BoxFuture<'a, OrmResult<()>> {
        Box::pin(self.load_into(ctx, conn, parents))
    }
}
