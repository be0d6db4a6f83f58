//! Error types and result types for record store operations.
//!
//! Absence of a record is never an error here: lookups return `Ok(None)` and deletes of
//! unknown ids succeed. Use [`RecordStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::validate::ValidationError;

/// Represents all possible errors that can occur when interacting with a record store.
#[derive(Error, Debug)]
pub enum RecordStoreError {
    /// The incoming payload was rejected by the validator.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Serialization/deserialization error when converting between record formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The backend could not be reached or initialized. Fatal to store startup.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    /// A replace targeted an id that is not stored.
    /// The first argument is the record id, the second is the collection name.
    #[error("Record {0} not found in collection {1}")]
    RecordNotFound(String, String),
    /// A stored or returned document does not have the shape of a record.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    /// A single backend call failed. The store stays usable.
    #[error("Backend error: {0}")]
    Backend(String),
    /// The store configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A specialized `Result` type for record store operations.
pub type RecordStoreResult<T> = Result<T, RecordStoreError>;

impl From<BsonError> for RecordStoreError {
    fn from(err: BsonError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for RecordStoreError {
    fn from(err: SerdeJsonError) -> Self {
        RecordStoreError::Serialization(err.to_string())
    }
}
