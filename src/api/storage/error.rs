//! Storage error types for the API storage backends.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage operation errors.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageError {
    /// Entity not found
    #[error("Entity not found: {entity_type} with id {entity_id}")]
    NotFound {
        entity_type: String,
        entity_id: String,
    },
    /// Unique constraint violated
    #[error("Duplicate {entity_type}: {key}")]
    Duplicate { entity_type: String, key: String },
    /// Database connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
    /// Seed file could not be read or parsed
    #[error("Seed error: {0}")]
    SeedError(String),
    /// General storage error
    #[error("Storage error: {0}")]
    Other(String),
}

impl StorageError {
    pub fn not_found(entity_type: &str, entity_id: impl ToString) -> Self {
        StorageError::NotFound {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StorageError::not_found("row", "unknown"),
            other => StorageError::ConnectionError(other.to_string()),
        }
    }
}
