//! Error types for WARDEN operations

use thiserror::Error;

/// Cache path errors.
///
/// Backend failures on the read path are expected to degrade to a cache
/// miss at the caller; only key validation failures indicate a caller bug.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid cache key: {reason}")]
    InvalidKey { reason: String },

    #[error("Cache backend failure during {operation}: {reason}")]
    Backend { operation: String, reason: String },

    #[error("Cache payload serialization failed: {reason}")]
    Serialization { reason: String },
}

/// Mutation lock errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("Lock busy for resource {resource_id}")]
    Busy { resource_id: String },

    #[error("Waiter queue full for resource {resource_id}: {waiting} queued, max {max_waiting}")]
    QueueFull {
        resource_id: String,
        waiting: u32,
        max_waiting: u32,
    },

    #[error("Lock wait cancelled for resource {resource_id}")]
    Cancelled { resource_id: String },

    #[error("Lock wait deadline exceeded for resource {resource_id} after {waited_ms}ms")]
    DeadlineExceeded { resource_id: String, waited_ms: u64 },

    #[error("Semaphore provider not registered: {provider}")]
    ProviderNotRegistered { provider: String },

    #[error("Semaphore backend failure during {operation}: {reason}")]
    Backend { operation: String, reason: String },
}

/// Checksum validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("Checksum computation failed for {subject}: {reason}")]
    Compute { subject: String, reason: String },

    #[error("Checksum mismatch for {subject}: stored {stored}, computed {computed}")]
    Mismatch {
        subject: String,
        stored: String,
        computed: String,
    },
}

/// Durable store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Entity not found in durable store: {key}")]
    NotFound { key: String },

    #[error("Durable store failure during {operation}: {reason}")]
    Backend { operation: String, reason: String },
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

/// Storage lifecycle hook failure.
///
/// Hook failures are reported to the lifecycle sink and never propagated
/// into the retrieval path, so this type does not feed [`WardenError`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Storage hook failed: {reason}")]
pub struct HookError {
    pub reason: String,
}

impl HookError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Master error type for all WARDEN errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WardenError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    #[error("Checksum error: {0}")]
    Checksum(#[from] ChecksumError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for WARDEN operations.
pub type WardenResult<T> = Result<T, WardenError>;

// =============================================================================
// TESTS
// =============================================================================
