//! Error types for the record store.

use std::time::Duration;

use rusqlite::{ffi, ErrorCode};
use thiserror::Error;

/// A broken schema rule on a single record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("column `{column}` is required")]
    Missing { column: String },
    #[error("column `{column}` must not be blank")]
    Blank { column: String },
    #[error("column `{column}` exceeds {max} characters (got {actual})")]
    TooLong {
        column: String,
        max: usize,
        actual: usize,
    },
    #[error("column `{column}` expects a value of type {expected}")]
    WrongType { column: String, expected: String },
    #[error("unknown column `{column}`")]
    UnknownColumn { column: String },
    #[error("column `{column}` must be unique")]
    Duplicate { column: String },
    /// A constraint the backing store enforced without naming a column.
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[from] Violation),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("database error: {0}")]
    Database(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, StoreError::ConstraintViolation(_))
    }

    /// True when the backing store could not be reached or did not answer.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Timeout(_))
    }

    pub fn violation(&self) -> Option<&Violation> {
        match self {
            StoreError::ConstraintViolation(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(failure, message) => {
                from_sqlite_failure(failure, message)
            }
            other @ (rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)) => {
                StoreError::Corrupt(other.to_string())
            }
            other => StoreError::Database(other.to_string()),
        }
    }
}

fn from_sqlite_failure(failure: ffi::Error, message: Option<String>) -> StoreError {
    let detail = message.unwrap_or_else(|| failure.to_string());
    match failure.code {
        ErrorCode::ConstraintViolation => {
            let violation = match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Violation::Duplicate {
                        column: constrained_column(&detail),
                    }
                }
                ffi::SQLITE_CONSTRAINT_NOTNULL => Violation::Missing {
                    column: constrained_column(&detail),
                },
                _ => Violation::Rejected(detail),
            };
            StoreError::ConstraintViolation(violation)
        }
        ErrorCode::CannotOpen
        | ErrorCode::NotADatabase
        | ErrorCode::SystemIoFailure
        | ErrorCode::DatabaseBusy
        | ErrorCode::DatabaseLocked
        | ErrorCode::PermissionDenied
        | ErrorCode::FileLockingProtocolFailed => StoreError::Connection(detail),
        _ => StoreError::Database(detail),
    }
}

// "UNIQUE constraint failed: user.email" -> "email"
fn constrained_column(detail: &str) -> String {
    let target = detail.rsplit(':').next().unwrap_or(detail);
    let first = target.split(',').next().unwrap_or(target).trim();
    first.rsplit('.').next().unwrap_or(first).to_string()
}
