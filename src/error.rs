use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum VamosError {
    #[error("VAMOS request failed: {0}")]
    Network(String),

    #[error("VAMOS returned status {status}: {message}")]
    ServiceStatus { status: u16, message: String },

    #[error("malformed response: {0}")]
    Format(String),

    #[error("invalid date {date}. Valid dates: {}", valid_dates.join(", "))]
    InvalidDate {
        date: String,
        valid_dates: Vec<String>,
    },

    #[error("staging constraint violated: {0}")]
    StorageConstraint(String),

    #[error("staging store error: {0}")]
    Storage(String),

    #[error("unknown variable: {0} (expected one of gesamt, reifen, bremsen, strasse, zw)")]
    UnknownVariable(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl From<rusqlite::Error> for VamosError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                VamosError::StorageConstraint(err.to_string())
            }
            _ => VamosError::Storage(err.to_string()),
        }
    }
}
