//! Column selection for insert, update and upsert.

use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};

/// Which columns take part in a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelection {
    /// Insert: every column without a default, plus default-bearing columns
    /// holding a non-zero value. Update: every non-key column.
    #[default]
    Infer,
    /// Exactly these columns.
    Explicit(Vec<String>),
}

impl ColumnSelection {
    pub fn explicit<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSelection::Explicit(columns.into_iter().map(Into::into).collect())
    }
}

/// Columns to write and columns to read back for an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InsertColumns {
    pub insert: Vec<&'static str>,
    pub returning: Vec<&'static str>,
}

/// Map caller names to the descriptor's `'static` names, keeping caller order
/// and dropping repeats.
pub(crate) fn explicit_columns<E: Entity>(names: &[String]) -> OrmResult<Vec<&'static str>> {
    let schema = E::schema();
    let mut out: Vec<&'static str> = Vec::with_capacity(names.len());
    for name in names {
        let column = schema
            .all
            .iter()
            .copied()
            .find(|c| *c == name.as_str())
            .ok_or_else(|| {
                OrmError::malformed(format!("{} has no column '{name}'", schema.table))
            })?;
        if !out.contains(&column) {
            out.push(column);
        }
    }
    Ok(out)
}

pub(crate) fn insert_columns<E: Entity>(
    selection: &ColumnSelection,
    entity: &E,
) -> OrmResult<InsertColumns> {
    let schema = E::schema();
    let insert = match selection {
        ColumnSelection::Infer => {
            let mut cols = Vec::with_capacity(schema.all.len());
            for column in schema.all {
                if !schema.has_default(column) || !entity.column_value(column)?.is_zero() {
                    cols.push(*column);
                }
            }
            cols
        }
        ColumnSelection::Explicit(names) => explicit_columns::<E>(names)?,
    };
    let returning = schema
        .with_default
        .iter()
        .copied()
        .filter(|c| !insert.contains(c))
        .collect();
    Ok(InsertColumns { insert, returning })
}

pub(crate) fn update_columns<E: Entity>(
    selection: &ColumnSelection,
) -> OrmResult<Vec<&'static str>> {
    let columns = match selection {
        ColumnSelection::Infer => E::schema().non_key_columns().collect(),
        ColumnSelection::Explicit(names) => explicit_columns::<E>(names)?,
    };
    if columns.is_empty() {
        return Err(OrmError::malformed(format!(
            "no columns to update on {}",
            E::table()
        )));
    }
    Ok(columns)
}
