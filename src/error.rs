//! Error types for table operations.
//!
//! Every fallible public operation returns [`Result`]. Errors are returned
//! synchronously to the caller and never retried internally.

use thiserror::Error;

/// Errors that can occur while creating, looking up, or operating on a table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    /// No table is registered under this name
    #[error("no such table: {0}")]
    NotFound(String),

    /// A table is already registered under this name
    #[error("table already exists: {0}")]
    AlreadyExists(String),

    /// A positional update targeted a key with no stored record
    #[error("no entry for key {0}")]
    KeyNotFound(u64),

    /// Malformed op, out-of-range position, or wrong value kind
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The table configuration cannot be used
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The table's batch dispatcher is not running
    #[error("table stopped: {0}")]
    Stopped(String),
}

impl TableError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TableError::InvalidArgument(msg.into())
    }
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;
