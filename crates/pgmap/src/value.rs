//! Dynamic scalar values crossing the store boundary.
//!
//! Entities expose their fields to the mapper as [`Value`]s through the static
//! descriptor table, and rows decoded from the store carry `Value`s back. A
//! `Value` binds directly as a statement parameter.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};
use tokio_postgres::types::{IsNull, ToSql, Type, WrongType, to_sql_checked};
use uuid::Uuid;

/// A single column value.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is the zero value of its type.
    ///
    /// Insert with inferred columns skips default-bearing columns whose value
    /// is zero so the store can fill them in.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(v) => !v,
            Value::Int(v) => *v == 0,
            Value::BigInt(v) => *v == 0,
            Value::Double(v) => *v == 0.0,
            Value::Text(v) => v.is_empty(),
            Value::Timestamp(v) => *v == NaiveDateTime::default(),
            Value::TimestampTz(v) => *v == DateTime::<Utc>::default(),
            Value::Uuid(v) => v.is_nil(),
        }
    }

    /// Short type name used in decode errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int4",
            Value::BigInt(_) => "int8",
            Value::Double(_) => "float8",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
        }
    }
}

// Integers compare across widths so an int4 key matches an int8 foreign key.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Int(a), BigInt(b)) | (BigInt(b), Int(a)) => i64::from(*a) == *b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Text(a), Text(b)) => a == b,
            (Timestamp(a), Timestamp(b)) => a == b,
            (TimestampTz(a), TimestampTz(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(v) => (1u8, v).hash(state),
            Value::Int(v) => (2u8, i64::from(*v)).hash(state),
            Value::BigInt(v) => (2u8, v).hash(state),
            Value::Double(v) => (3u8, v.to_bits()).hash(state),
            Value::Text(v) => (4u8, v).hash(state),
            Value::Timestamp(v) => (5u8, v).hash(state),
            Value::TimestampTz(v) => (6u8, v).hash(state),
            Value::Uuid(v) => (7u8, v).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "'{v}'"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::TimestampTz(v) => write!(f, "{v}"),
            Value::Uuid(v) => write!(f, "{v}"),
        }
    }
}

/// Bind `value` as `T` when `T` accepts the parameter type, otherwise fail
/// with `WrongType` instead of sending bytes the server would misread.
fn bind<T: ToSql>(
    value: &T,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if !T::accepts(ty) {
        return Err(Box::new(WrongType::new::<T>(ty.clone())));
    }
    value.to_sql(ty, out)
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => bind(v, ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => bind(&i16::try_from(*v)?, ty, out),
                Type::INT8 => bind(&i64::from(*v), ty, out),
                _ => bind(v, ty, out),
            },
            Value::BigInt(v) => match *ty {
                Type::INT2 => bind(&i16::try_from(*v)?, ty, out),
                Type::INT4 => bind(&i32::try_from(*v)?, ty, out),
                _ => bind(v, ty, out),
            },
            Value::Double(v) => match *ty {
                Type::FLOAT4 => bind(&(*v as f32), ty, out),
                _ => bind(v, ty, out),
            },
            Value::Text(v) => bind(v, ty, out),
            Value::Timestamp(v) => bind(v, ty, out),
            Value::TimestampTz(v) => bind(v, ty, out),
            Value::Uuid(v) => bind(v, ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::BOOL | Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT4 | Type::FLOAT8
        ) || <String as ToSql>::accepts(ty)
            || <NaiveDateTime as ToSql>::accepts(ty)
            || <DateTime<Utc> as ToSql>::accepts(ty)
            || <Uuid as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a [`Value`] into a typed field.
///
/// Errors carry a message only; callers attach the column name.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, found: &Value) -> String {
    format!("expected {expected}, found {}", found.type_name())
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(v) => Ok(v),
            Value::BigInt(v) => i32::try_from(v).map_err(|e| e.to_string()),
            other => Err(mismatch("int4", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(v) => Ok(i64::from(v)),
            Value::BigInt(v) => Ok(v),
            other => Err(mismatch("int8", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Int(v) => Ok(f64::from(v)),
            other => Err(mismatch("float8", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(v) => Ok(v),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::TimestampTz(v) => Ok(v.naive_utc()),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::TimestampTz(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc()),
            other => Err(mismatch("timestamptz", &other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Uuid(v) => Ok(v),
            other => Err(mismatch("uuid", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
