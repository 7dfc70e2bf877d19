//! Error types for pipeline consumers and execution trees

use std::io;
use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A pipeline description was rejected at build time
    #[error("Build error: {0}")]
    Build(String),

    /// A required input was absent
    #[error("Null input: {0}")]
    NullInput(String),

    /// A consumer was bound to a tree more than once
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),

    /// Execution failure surfaced through a consumer operation
    #[error("Pipeline error in {consumer}::{operation}: {message}")]
    Pipeline {
        /// Consumer that surfaced the failure
        consumer: String,

        /// Operation that was running when the tree failed
        operation: String,

        /// Description of the underlying failure
        message: String,
    },

    /// An operation ran before the consumer was started
    #[error("Not started: {0}")]
    NotStarted(String),

    /// A bulk write aborted after persisting some rows
    #[error("Partial write: {written} rows persisted before failure: {message}")]
    PartialWrite {
        /// Rows durably persisted before the failure
        written: u64,

        /// Description of the underlying failure
        message: String,
    },

    /// A pipeline shape value cannot be determined
    #[error("Unknown shape: {0}")]
    UnknownShape(String),

    /// Feature not implemented
    #[error("Feature not implemented: {0}")]
    NotImplemented(String),

    /// Column names collide when re-keying a row by name
    #[error("Duplicate column name: {0}")]
    DuplicateColumnName(String),

    /// Invalid operation for the current lifecycle state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Schema mismatch between declared and observed columns
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Data type mismatch
    #[error("Data type mismatch: {0}")]
    TypeMismatch(String),

    /// Memory layout error (alignment, stride, etc.)
    #[error("Memory layout error: {0}")]
    LayoutError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Manifest encoding or decoding error
    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a tree failure with the consumer and operation that surfaced it
    pub fn pipeline(
        consumer: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Pipeline {
            consumer: consumer.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}
