//! Core error types for medireminder-core.
//!
//! Nothing in the reminder flow is fatal: persisted-data decode failures
//! degrade to empty collections, OS registration failures are logged, and
//! unresolvable notification receipts are dropped. The errors below are the
//! ones that do reach callers -- form validation, storage I/O and config.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for medireminder-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors, surfaced to the user as a blocking message
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Notification service errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Lookup of a persisted entity failed
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A thread panicked while holding the connection
    #[error("Storage lock poisoned")]
    Poisoned,

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors for medications and schedule entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty or whitespace only
    #[error("Please enter the medication name.")]
    EmptyName,

    /// A medication needs at least one dosing time
    #[error("Please add at least one dosing time.")]
    NoScheduleEntries,

    /// Weekday numbers run from 1 (Sunday) to 7 (Saturday)
    #[error("Invalid weekday number {0}: expected 1 (Sunday) to 7 (Saturday)")]
    InvalidWeekday(u8),

    /// Interval recurrences need at least one day between doses
    #[error("Interval must be at least one day")]
    ZeroInterval,

    /// Cycles need at least one active day
    #[error("Cycle needs at least one active day")]
    EmptyCycle,

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Notification service errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The OS refused a reminder registration
    #[error("Failed to register reminder '{id}': {message}")]
    RegistrationFailed { id: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::EmptyName.to_string(),
            "Please enter the medication name."
        );
        assert_eq!(
            ValidationError::NoScheduleEntries.to_string(),
            "Please add at least one dosing time."
        );
    }

    #[test]
    fn validation_converts_into_core_error() {
        let err: CoreError = ValidationError::ZeroInterval.into();
        assert!(matches!(err, CoreError::Validation(ValidationError::ZeroInterval)));
    }

    #[test]
    fn undecodable_json_converts_into_core_error() {
        let err: CoreError = serde_json::from_str::<u32>("{").unwrap_err().into();
        assert!(matches!(err, CoreError::Json(_)));
        assert!(err.to_string().starts_with("JSON error:"));
    }

    #[test]
    fn rusqlite_error_maps_to_query_failed() {
        let err: StorageError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StorageError::QueryFailed(_)));
    }
}
