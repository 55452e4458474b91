//! Query builder.
//!
//! [`Query`] composes filters, ordering, paging and eager-load directives for
//! one entity type and runs them through a terminal operation. Predicates are
//! written with `?` placeholders and rendered with `$n`:
//!
//! ```ignore
//! use pgmap::{ColumnValues, Context};
//!
//! let ctx = Context::background();
//!
//! let n = books
//!     .query()
//!     .filter("published_year < ?", [1990])
//!     .count(&ctx, &client)
//!     .await?;
//!
//! books
//!     .query()
//!     .filter("author = ?", ["Anonymous"])
//!     .update_all(&ctx, &client, ColumnValues::new().set("author", "Unknown"))
//!     .await?;
//! ```

mod expr;
mod query;

pub use expr::{Expr, ExprGroup, count_placeholders};
pub use query::Query;

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Ordered column → value assignments for bulk updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    entries: Vec<(String, Value)>,
}

impl ColumnValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `column`, replacing an earlier assignment to it.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    /// Render `col = $n, ...` for the table of `E`.
    ///
    /// Every column must belong to `E`; an empty set is rejected.
    pub(crate) fn build_set<E: Entity>(&self, params: &mut Vec<Value>) -> OrmResult<String> {
        if self.entries.is_empty() {
            return Err(OrmError::malformed("update requires at least one column"));
        }
        let schema = E::schema();
        let parts = self
            .entries
            .iter()
            .map(|(column, value)| {
                if !schema.has_column(column) {
                    return Err(OrmError::malformed(format!(
                        "{} has no column '{column}'",
                        schema.table
                    )));
                }
                params.push(value.clone());
                Ok(format!("{} = ${}", column, params.len()))
            })
            .collect::<OrmResult<Vec<_>>>()?;
        Ok(parts.join(", "))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ColumnValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (column, value) in iter {
            values = values.set(column, value);
        }
        values
    }
}
