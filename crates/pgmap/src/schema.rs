//! Static table descriptors.
//!
//! A [`TableSchema`] is emitted once per entity type by `#[derive(Entity)]` and
//! lives in a `static`. It names the table, partitions its columns into the
//! four lists the mapper needs and records each column's declared type.

use crate::error::{OrmError, OrmResult};
use std::collections::HashSet;
use std::fmt;

/// Declared scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    BigInt,
    Double,
    Text,
    Varchar,
    Boolean,
    Timestamp,
    TimestampTz,
    Uuid,
}

impl SqlType {
    /// PostgreSQL type name, usable in casts.
    pub fn pg_name(self) -> &'static str {
        match self {
            SqlType::Integer => "integer",
            SqlType::BigInt => "bigint",
            SqlType::Double => "double precision",
            SqlType::Text => "text",
            SqlType::Varchar => "character varying",
            SqlType::Boolean => "boolean",
            SqlType::Timestamp => "timestamp without time zone",
            SqlType::TimestampTz => "timestamp with time zone",
            SqlType::Uuid => "uuid",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pg_name())
    }
}

/// Table name, column partitions and column types of one entity type.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub all: &'static [&'static str],
    pub primary_key: &'static [&'static str],
    pub with_default: &'static [&'static str],
    pub without_default: &'static [&'static str],
    pub types: &'static [(&'static str, SqlType)],
}

impl TableSchema {
    pub fn sql_type(&self, column: &str) -> Option<SqlType> {
        self.types
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, ty)| *ty)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.all.contains(&column)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.contains(&column)
    }

    pub fn has_default(&self, column: &str) -> bool {
        self.with_default.contains(&column)
    }

    /// Every column that is not part of the primary key, in table order.
    pub fn non_key_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.all
            .iter()
            .copied()
            .filter(move |c| !self.is_primary_key(c))
    }

    /// Comma-separated, table-qualified select list.
    pub fn select_list(&self) -> String {
        self.all
            .iter()
            .map(|c| format!("{}.{}", self.table, c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check the column partition invariants.
    pub fn validate(&self) -> OrmResult<()> {
        let all: HashSet<&str> = self.all.iter().copied().collect();
        if all.len() != self.all.len() {
            return Err(OrmError::malformed(format!(
                "table {} declares a column twice",
                self.table
            )));
        }
        if self.primary_key.is_empty() {
            return Err(OrmError::malformed(format!(
                "table {} has no primary key",
                self.table
            )));
        }
        if let Some(c) = self.primary_key.iter().find(|c| !all.contains(*c)) {
            return Err(OrmError::malformed(format!(
                "primary key column {c} is not a column of {}",
                self.table
            )));
        }
        let with: HashSet<&str> = self.with_default.iter().copied().collect();
        let without: HashSet<&str> = self.without_default.iter().copied().collect();
        if let Some(c) = with.intersection(&without).next() {
            return Err(OrmError::malformed(format!(
                "column {c} of {} is listed both with and without a default",
                self.table
            )));
        }
        let union: HashSet<&str> = with.union(&without).copied().collect();
        if union != all {
            return Err(OrmError::malformed(format!(
                "default partitions of {} do not cover its columns",
                self.table
            )));
        }
        if self.types.len() != self.all.len()
            || self.all.iter().any(|c| self.sql_type(c).is_none())
        {
            return Err(OrmError::malformed(format!(
                "table {} has columns without a declared type",
                self.table
            )));
        }
        Ok(())
    }
}
