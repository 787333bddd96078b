use crate::domain::value_objects::offline::{EntityId, EntityKind};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    Network(String),
    Storage(String),
    NotFound(String),
    InvalidInput(String),
    ValidationError(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::Network(msg) => write!(f, "Network error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Outcome classes of a single queued operation against the remote.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Authentication rejected by remote: {0}")]
    Unauthorized(String),

    #[error("Permanent validation error: {0}")]
    PermanentValidation(String),

    #[error("Server conflict: {message}")]
    ServerConflict {
        message: String,
        /// Server copy of the record when the conflict response carried one.
        remote: Option<Value>,
    },

    #[error("Local storage error: {0}")]
    LocalStorage(String),

    /// The record this operation needs has not reached the remote yet.
    /// `parked` is set when that record is itself stuck at the retry ceiling.
    #[error("Dependency not ready: {entity} {entity_id}")]
    DependencyNotReady {
        entity: EntityKind,
        entity_id: EntityId,
        parked: bool,
    },
}

impl SyncError {
    /// Transient errors leave the operation pending and charge a retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::TransientNetwork(_) | SyncError::Unauthorized(_) | SyncError::LocalStorage(_)
        )
    }
}

impl From<AppError> for SyncError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Network(msg) => SyncError::TransientNetwork(msg),
            other => SyncError::LocalStorage(other.to_string()),
        }
    }
}
