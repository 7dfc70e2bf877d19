//! Declarative pipeline descriptions and the adapter that binds them

use tracing::info;

use crate::error::{Error, Result};
use crate::source::{Cardinality, RowSource};
use crate::tree::{Epochs, ExecutionTree, PipelineMetadata, SourceTree};

/// Declarative description of the pipeline a consumer binds to
///
/// The description is assembled with chained setters and handed to the
/// consumer at initialization; it is immutable from then on.
pub struct DatasetDescription {
    /// Root row source
    source: Option<Box<dyn RowSource>>,

    /// Passes over the source per epoch
    repeat: usize,

    /// Batch size declared by downstream batching
    batch_size: usize,
}

impl DatasetDescription {
    /// Create a new description with default properties
    pub fn new() -> Self {
        Self {
            source: None,
            repeat: 1,
            batch_size: 1,
        }
    }

    /// Set the root source of the pipeline
    pub fn with_source(mut self, source: Box<dyn RowSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the number of passes over the source per epoch
    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set the batch size declared by the pipeline
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Default for DatasetDescription {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds a dataset description into an executable tree
pub struct TreeAdapter;

impl TreeAdapter {
    /// Validate a description and produce the executable tree
    ///
    /// Derives the static pipeline shape at build time: rows per epoch
    /// when the source cardinality is exact, output names, types and
    /// shapes from the source schema, and the declared batch and repeat
    /// counts.
    pub fn build(description: DatasetDescription, epochs: Epochs) -> Result<Box<dyn ExecutionTree>> {
        let source = description
            .source
            .ok_or_else(|| Error::NullInput("dataset description has no source".into()))?;

        if description.repeat == 0 {
            return Err(Error::Build("repeat count must be at least 1".into()));
        }
        if description.batch_size == 0 {
            return Err(Error::Build("batch size must be at least 1".into()));
        }
        if epochs == Epochs::Finite(0) {
            return Err(Error::Build("epoch budget must be at least 1".into()));
        }

        let schema = source.schema();
        if schema.is_empty() {
            return Err(Error::Build("source schema has no columns".into()));
        }

        let cardinality = source.cardinality();
        if cardinality == Cardinality::Exact(0) {
            return Err(Error::Build("source produces no rows".into()));
        }

        let rows_per_epoch = match cardinality {
            Cardinality::Exact(rows) => Some(rows * description.repeat),
            Cardinality::Unknown | Cardinality::Unbounded => None,
        };

        let metadata = PipelineMetadata {
            rows_per_epoch,
            batch_size: description.batch_size,
            repeat_count: description.repeat,
            num_classes: source.num_classes(),
            cardinality,
            output_names: schema.names(),
            output_types: schema.columns().iter().map(|c| c.dtype).collect(),
            output_shapes: schema.columns().iter().map(|c| c.shape.clone()).collect(),
        };

        info!(
            columns = metadata.output_names.len(),
            rows_per_epoch = ?metadata.rows_per_epoch,
            repeat = metadata.repeat_count,
            "execution tree built"
        );

        Ok(Box::new(SourceTree::new(source, metadata, epochs)))
    }
}
