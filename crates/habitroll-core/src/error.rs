//! Core error types for habitroll-core.
//!
//! Every public operation returns [`CoreError`]. Validation failures
//! (`NotFound`, `Inactive`, `InvalidStateTransition`) are always raised before
//! any write happens; `Persistence` means the enclosing transaction was rolled
//! back and the store is in its pre-call state.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::ProgressStatus;

/// Entity kinds referenced by lookup and activity errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Habit,
    Reward,
    Completion,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Habit => "habit",
            EntityKind::Reward => "reward",
            EntityKind::Completion => "completion",
        };
        f.write_str(name)
    }
}

/// Core error type for habitroll-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Referenced entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: i64 },

    /// User or habit has been disabled
    #[error("{entity} {id} is inactive")]
    Inactive { entity: EntityKind, id: i64 },

    /// Progress state machine rejected the requested action
    #[error("cannot {action} reward {reward_id}: progress is {status}")]
    InvalidStateTransition {
        reward_id: i64,
        status: ProgressStatus,
        action: &'static str,
    },

    /// Database-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Only persistence failures qualify; the engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Persistence(_))
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked by another writer
    #[error("Database is locked")]
    Locked,
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

    /// Home/data directory could not be resolved
    #[error("Cannot resolve data directory")]
    NoDataDir,
}

/// Validation errors for management input.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Weight must be a finite positive number
    #[error("Invalid weight for '{field}': {value} (must be finite and > 0)")]
    InvalidWeight { field: &'static str, value: f64 },

    /// Reward goal must be at least one piece
    #[error("pieces_required must be >= 1, got {0}")]
    InvalidPiecesRequired(i64),

    /// Empty display name
    #[error("Empty value for '{0}'")]
    Empty(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Persistence(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
