//! Error types for orderflow operations

use thiserror::Error;

/// Durable store errors.
///
/// These signal infrastructure trouble, never bad input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Write failed for order {order_uid}: {reason}")]
    WriteFailed { order_uid: String, reason: String },

    #[error("Read failed for order {order_uid}: {reason}")]
    ReadFailed { order_uid: String, reason: String },

    #[error("Query failed: {reason}")]
    QueryFailed { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Migration {name} failed: {reason}")]
    MigrationFailed { name: String, reason: String },
}

/// Field-level validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid length for {field}: {len} not in {min}..={max}")]
    InvalidLength {
        field: String,
        len: usize,
        min: usize,
        max: usize,
    },

    #[error("Value out of range for {field}: {value} - {reason}")]
    OutOfRange {
        field: String,
        value: i64,
        reason: String,
    },

    #[error("Invalid format for {field}: expected {expected}")]
    InvalidFormat { field: String, expected: String },
}

impl ValidationError {
    /// Path of the offending field, e.g. `items[0].sale`.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::RequiredFieldMissing { field }
            | ValidationError::InvalidLength { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Payload decoding errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed payload: {reason}")]
    Malformed { reason: String },
}

/// Message source errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Failed to connect to message source: {reason}")]
    ConnectFailed { reason: String },

    #[error("Failed to receive message: {reason}")]
    ReceiveFailed { reason: String },

    #[error("Commit failed at {position}: {reason}")]
    CommitFailed { position: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all orderflow errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderflowError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for orderflow operations.
pub type OrderflowResult<T> = Result<T, OrderflowError>;

// =============================================================================
// TESTS
// =============================================================================
