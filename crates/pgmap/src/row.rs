//! Decoded result rows.

use crate::error::{OrmError, OrmResult};
use crate::value::{FromValue, Value};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::sync::Arc;
use tokio_postgres::types::Type;

/// One result row: column names shared across a result set, plus values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row from parallel column/value lists.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> OrmResult<Self> {
        if columns.len() != values.len() {
            return Err(OrmError::Other(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value of the named column, if present.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Value at a column index.
    pub fn get_idx(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Typed access by column name.
    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self
            .get(column)
            .cloned()
            .ok_or_else(|| OrmError::decode(column, "column not present in row"))?;
        T::from_value(value).map_err(|message| OrmError::decode(column, message))
    }

    /// Iterate `(column, value)` pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Decode a tokio_postgres result set.
    pub fn from_pg_rows(rows: &[tokio_postgres::Row]) -> OrmResult<Vec<Self>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        rows.iter()
            .map(|row| {
                let values = (0..columns.len())
                    .map(|idx| decode_column(row, idx))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(Self {
                    columns: Arc::clone(&columns),
                    values,
                })
            })
            .collect()
    }
}

fn decode_column(row: &tokio_postgres::Row, idx: usize) -> OrmResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let name = column.name();
    let wrap = |e: tokio_postgres::Error| OrmError::decode(name, e.to_string());

    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).map_err(wrap)?.into(),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(wrap)?
            .map(i32::from)
            .into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).map_err(wrap)?.into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).map_err(wrap)?.into(),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(wrap)?
            .map(f64::from)
            .into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).map_err(wrap)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(idx).map_err(wrap)?.into()
        }
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(wrap)?
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(wrap)?
            .into(),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(idx)
            .map_err(wrap)?
            .into(),
        _ => {
            return Err(OrmError::decode(
                name,
                format!("unsupported column type {ty}"),
            ));
        }
    };
    Ok(value)
}
