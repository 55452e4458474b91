//! Options for `INSERT ... ON CONFLICT`.

use super::columns::{ColumnSelection, explicit_columns, insert_columns};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};

/// How [`Mapper::upsert`](crate::Mapper::upsert) resolves a conflict.
///
/// ```ignore
/// // Insert, or overwrite title and author of the existing row.
/// let opts = UpsertOptions::new()
///     .update(ColumnSelection::explicit(["title", "author"]));
///
/// // Insert, or leave the existing row alone.
/// let opts = UpsertOptions::do_nothing();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOptions {
    /// `DO UPDATE` when true, `DO NOTHING` otherwise.
    pub update_on_conflict: bool,
    /// Conflict target; the primary key when empty.
    pub conflict_columns: Vec<String>,
    pub insert_columns: ColumnSelection,
    /// `Infer` updates every inserted column outside the conflict target.
    pub update_columns: ColumnSelection,
}

impl Default for UpsertOptions {
    fn default() -> Self {
        Self {
            update_on_conflict: true,
            conflict_columns: Vec::new(),
            insert_columns: ColumnSelection::Infer,
            update_columns: ColumnSelection::Infer,
        }
    }
}

impl UpsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn do_nothing() -> Self {
        Self {
            update_on_conflict: false,
            ..Self::default()
        }
    }

    pub fn update_on_conflict(mut self, update: bool) -> Self {
        self.update_on_conflict = update;
        self
    }

    pub fn conflict_on<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflict_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn insert(mut self, selection: ColumnSelection) -> Self {
        self.insert_columns = selection;
        self
    }

    pub fn update(mut self, selection: ColumnSelection) -> Self {
        self.update_columns = selection;
        self
    }

    pub(crate) fn plan<E: Entity>(&self, entity: &E) -> OrmResult<UpsertPlan> {
        let columns = insert_columns::<E>(&self.insert_columns, entity)?;
        let conflict = if self.conflict_columns.is_empty() {
            E::schema().primary_key.to_vec()
        } else {
            explicit_columns::<E>(&self.conflict_columns)?
        };

        let update = if self.update_on_conflict {
            let update: Vec<&'static str> = match &self.update_columns {
                ColumnSelection::Infer => columns
                    .insert
                    .iter()
                    .copied()
                    .filter(|c| !conflict.contains(c))
                    .collect(),
                ColumnSelection::Explicit(names) => explicit_columns::<E>(names)?,
            };
            if update.is_empty() {
                return Err(OrmError::malformed(format!(
                    "upsert on {} has no columns to update on conflict",
                    E::table()
                )));
            }
            Some(update)
        } else {
            None
        };

        Ok(UpsertPlan {
            insert: columns.insert,
            conflict,
            update,
            returning: columns.returning,
        })
    }
}

/// Resolved column lists for one upsert statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UpsertPlan {
    pub insert: Vec<&'static str>,
    pub conflict: Vec<&'static str>,
    /// `None` renders `DO NOTHING`.
    pub update: Option<Vec<&'static str>>,
    pub returning: Vec<&'static str>,
}
