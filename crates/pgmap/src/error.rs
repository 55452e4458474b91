//! Error types for pgmap

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for pgmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Which kind of integrity constraint the store rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unique => "unique",
            Self::ForeignKey => "foreign key",
            Self::Check => "check",
            Self::NotNull => "not null",
        })
    }
}

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Transport-level failure (closed connection, pool checkout, connection exception)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error not covered by a more specific variant
    #[error("Query error: {0}")]
    Query(#[source] tokio_postgres::Error),

    /// Zero rows where exactly one was expected
    #[error("Not found: {0}")]
    NotFound(String),

    /// Integrity constraint rejected by the store
    #[error("{kind} constraint violation on '{constraint}': {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        constraint: String,
        message: String,
    },

    /// Invalid builder state or placeholder/argument mismatch
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// A slice operation touched a different number of rows than the slice holds
    #[error("Partial failure: expected {expected} rows, got {actual}")]
    PartialFailure { expected: u64, actual: u64 },

    /// A single-entity mutation touched more than one row
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),

    /// The operation was cancelled through its context or by the server
    #[error("Operation cancelled")]
    Cancelled,

    /// The context deadline or statement timeout elapsed
    #[error("Deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a malformed query error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedQuery(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_))
    }

    /// Classify a tokio_postgres error into the taxonomy above.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }

        if let Some(db_err) = err.as_db_error() {
            let code = db_err.code().code();
            let kind = match code {
                "23505" => Some(ConstraintKind::Unique),
                "23503" => Some(ConstraintKind::ForeignKey),
                "23514" => Some(ConstraintKind::Check),
                "23502" => Some(ConstraintKind::NotNull),
                _ => None,
            };
            if let Some(kind) = kind {
                return Self::ConstraintViolation {
                    kind,
                    constraint: db_err
                        .constraint()
                        .or(db_err.column())
                        .unwrap_or("unknown")
                        .to_string(),
                    message: db_err.message().to_string(),
                };
            }
            if code == "57014" {
                return Self::Cancelled;
            }
            if code.starts_with("08") {
                return Self::Connection(db_err.message().to_string());
            }
            return Self::Query(err);
        }

        // No server error attached: I/O, TLS or protocol failure.
        if std::error::Error::source(&err).is_some_and(|s| s.is::<std::io::Error>()) {
            return Self::Connection(err.to_string());
        }
        Self::Query(err)
    }
}

impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::from_db_error(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Backend(e) => Self::from_db_error(e),
            other => Self::Connection(other.to_string()),
        }
    }
}
