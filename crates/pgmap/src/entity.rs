//! The `Entity` trait and its static descriptor table.

use crate::eager::Relation;
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::schema::TableSchema;
use crate::value::Value;
use std::fmt;

/// One entry of an entity's descriptor table: a column name paired with a
/// typed getter and setter for the field that stores it.
pub struct Column<E> {
    pub name: &'static str,
    pub get: fn(&E) -> Value,
    pub set: fn(&mut E, Value) -> OrmResult<()>,
}

impl<E> Clone for Column<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Column<E> {}

impl<E> fmt::Debug for Column<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column").field("name", &self.name).finish()
    }
}

/// A struct bound to one table.
///
/// Normally implemented with `#[derive(Entity)]`:
///
/// ```ignore
/// use pgmap::Entity;
///
/// #[derive(Debug, Clone, Default, Entity)]
/// #[orm(table = "books")]
/// pub struct Book {
///     #[orm(id, default)]
///     pub id: i32,
///     #[orm(sql_type = "varchar")]
///     pub title: String,
///     #[orm(default)]
///     pub created_at: chrono::NaiveDateTime,
/// }
/// ```
pub trait Entity: Default + Send + Sync + Sized + 'static {
    /// Table name and column partitions.
    fn schema() -> &'static TableSchema;

    /// Column ↔ field accessor table, in table column order.
    fn columns() -> &'static [Column<Self>];

    /// Relations that `Query::load` can resolve by name.
    fn relations() -> &'static [&'static dyn Relation<Self>] {
        &[]
    }

    fn table() -> &'static str {
        Self::schema().table
    }

    fn column(name: &str) -> Option<&'static Column<Self>> {
        Self::columns().iter().find(|c| c.name == name)
    }

    fn relation(name: &str) -> Option<&'static dyn Relation<Self>> {
        Self::relations().iter().copied().find(|r| r.name() == name)
    }

    /// Current value of the named column.
    fn column_value(&self, name: &str) -> OrmResult<Value> {
        let column = Self::column(name).ok_or_else(|| unknown_column::<Self>(name))?;
        Ok((column.get)(self))
    }

    /// Overwrite the field bound to the named column.
    fn set_column_value(&mut self, name: &str, value: Value) -> OrmResult<()> {
        let column = Self::column(name).ok_or_else(|| unknown_column::<Self>(name))?;
        (column.set)(self, value)
    }

    /// Primary key values in primary key column order.
    fn primary_key_values(&self) -> OrmResult<Vec<Value>> {
        Self::schema()
            .primary_key
            .iter()
            .map(|c| self.column_value(c))
            .collect()
    }

    /// Hydrate a new entity; every column must be present in the row.
    fn from_row(row: &Row) -> OrmResult<Self> {
        let mut entity = Self::default();
        for column in Self::columns() {
            let value = row
                .get(column.name)
                .cloned()
                .ok_or_else(|| OrmError::decode(column.name, "column not present in row"))?;
            (column.set)(&mut entity, value)?;
        }
        Ok(entity)
    }

    /// Overwrite the fields of the columns present in `row`, leaving others alone.
    fn apply_row(&mut self, row: &Row) -> OrmResult<()> {
        for (name, value) in row.iter() {
            if let Some(column) = Self::column(name) {
                (column.set)(self, value.clone())?;
            }
        }
        Ok(())
    }
}

fn unknown_column<E: Entity>(name: &str) -> OrmError {
    OrmError::malformed(format!("{} has no column '{name}'", E::table()))
}
