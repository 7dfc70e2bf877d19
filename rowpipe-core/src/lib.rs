//! Core data model and pull contract for dataset pipeline consumers
//!
//! This crate provides the foundational pieces the consumer front-ends
//! build on: tensor-valued rows and their schemas, the row source seam
//! where readers plug in, and the execution tree contract with its
//! tagged pull outcome that keeps epoch boundaries and exhaustion out
//! of band from data.

#![warn(missing_docs)]

pub mod dataset;
pub mod error;
pub mod row;
pub mod schema;
pub mod source;
pub mod tensor;
pub mod tree;

// Re-export key types for convenience
pub use dataset::{DatasetDescription, TreeAdapter};
pub use error::{Error, Result};
pub use row::Row;
pub use schema::{ColumnSpec, DataType, Dim, RowSchema, TensorShape};
pub use source::{Cardinality, RowSource, VecSource};
pub use tensor::{Element, Tensor};
pub use tree::{Epochs, ExecutionTree, PipelineMetadata, Pull, SourceTree};
