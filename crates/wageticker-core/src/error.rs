//! Core error types for wageticker-core.
//!
//! Validation problems are reported to the caller without touching state.
//! Persistence problems are logged and isolated to the attempt that hit them;
//! loading falls back to defaults instead of surfacing them.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wageticker-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Failed to open the backing database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDirUnavailable(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// The stored record could not be decoded
    #[error("Stored record under '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    /// The record could not be encoded for writing
    #[error("Failed to encode record: {0}")]
    Encode(String),

    /// The backend refused the write
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors for settings entered by the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Gross wage must be a positive, finite amount
    #[error("Please enter a valid gross wage (got {value})")]
    InvalidGrossWage { value: f64 },

    /// Hours per week outside 1..=168
    #[error("Please enter valid hours per week (1-168), got {value}")]
    HoursOutOfRange { value: u32 },

    /// Age outside 15..=100
    #[error("Please enter a valid age between 15 and 100, got {value}")]
    AgeOutOfRange { value: u32 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked
                    || code.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    PersistenceError::Locked
                } else {
                    PersistenceError::QueryFailed(err.to_string())
                }
            }
            _ => PersistenceError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_name_the_range() {
        let err = ValidationError::HoursOutOfRange { value: 200 };
        assert!(err.to_string().contains("1-168"));

        let err = ValidationError::AgeOutOfRange { value: 12 };
        assert!(err.to_string().contains("15 and 100"));
    }

    #[test]
    fn persistence_errors_wrap_into_core_error() {
        let err: CoreError = PersistenceError::Locked.into();
        assert!(matches!(err, CoreError::Persistence(PersistenceError::Locked)));
        assert_eq!(err.to_string(), "Persistence error: Database is locked");
    }

    #[test]
    fn rusqlite_no_rows_maps_to_query_failed() {
        let err: PersistenceError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, PersistenceError::QueryFailed(_)));
    }
}
