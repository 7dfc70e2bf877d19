//! Pipeline shape and size queries without a training pass

use tracing::debug;

use rowpipe_core::{
    Cardinality, DataType, DatasetDescription, Epochs, Error, PipelineMetadata, Result,
    TensorShape,
};

use crate::consumer::{Consumer, ConsumerCore, LifecycleState};

/// Answers questions about a pipeline without consuming it
///
/// Every getter is served from metadata captured at bind time. When the
/// row count is not statically known, the first `dataset_size()` call
/// runs one measuring pass over a single epoch of its own private tree
/// and memoizes the result; later calls are free, and no getter ever
/// touches another consumer's rows.
pub struct IntrospectionConsumer {
    /// Shared lifecycle and tree ownership
    core: ConsumerCore,

    /// Metadata snapshot, enriched by the measuring pass
    cached: Option<PipelineMetadata>,
}

impl IntrospectionConsumer {
    /// Create an introspection consumer
    pub fn new() -> Self {
        Self {
            core: ConsumerCore::new("introspection"),
            cached: None,
        }
    }

    /// Rows in one epoch of the dataset
    ///
    /// Measured lazily when the source does not declare a cardinality.
    /// An unbounded dataset has no size and fails with
    /// [`Error::UnknownShape`] instead of reporting zero.
    pub fn dataset_size(&mut self) -> Result<usize> {
        let (known, cardinality) = {
            let metadata = self.metadata()?;
            (metadata.rows_per_epoch, metadata.cardinality)
        };
        if let Some(size) = known {
            return Ok(size);
        }
        if cardinality == Cardinality::Unbounded {
            return Err(Error::UnknownShape(
                "dataset is unbounded; it has no finite size".to_string(),
            ));
        }

        let size = self.count_one_epoch()?;
        if let Some(metadata) = self.cached.as_mut() {
            metadata.rows_per_epoch = Some(size);
        }
        Ok(size)
    }

    /// Declared batch size of the pipeline
    pub fn batch_size(&self) -> Result<usize> {
        Ok(self.metadata()?.batch_size)
    }

    /// Declared repeat factor of the pipeline
    pub fn repeat_count(&self) -> Result<usize> {
        Ok(self.metadata()?.repeat_count)
    }

    /// Number of label classes the source declares
    ///
    /// Never inferred from the data; an undeclared class count fails
    /// with [`Error::UnknownShape`].
    pub fn num_classes(&self) -> Result<usize> {
        self.metadata()?.num_classes.ok_or_else(|| {
            Error::UnknownShape("the source does not declare a class count".to_string())
        })
    }

    /// Column names in natural order
    pub fn output_names(&self) -> Result<Vec<String>> {
        Ok(self.metadata()?.output_names.clone())
    }

    /// Column element types in natural order
    pub fn output_types(&self) -> Result<Vec<DataType>> {
        Ok(self.metadata()?.output_types.clone())
    }

    /// Column shapes in natural order
    pub fn output_shapes(&self) -> Result<Vec<TensorShape>> {
        Ok(self.metadata()?.output_shapes.clone())
    }

    fn metadata(&self) -> Result<&PipelineMetadata> {
        self.cached.as_ref().ok_or_else(|| {
            Error::NotStarted("introspection consumer has not been initialized".to_string())
        })
    }

    /// One measuring pass over a single epoch
    fn count_one_epoch(&mut self) -> Result<usize> {
        let name = self.core.name();
        debug!(consumer = name, "measuring dataset size with a dry pass");

        let tree = self.core.tree_mut()?;
        let mut rows = 0usize;
        loop {
            let pull = tree
                .pull()
                .map_err(|e| Error::pipeline(name, "dataset_size", e.to_string()))?;
            // The tree is bound to a single epoch, so the first non-row
            // outcome ends the pass.
            match pull.into_row() {
                Some(_) => rows += 1,
                None => break,
            }
        }
        Ok(rows)
    }
}

impl Default for IntrospectionConsumer {
    fn default() -> Self {
        Self::new()
    }
}

impl Consumer for IntrospectionConsumer {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn initialize(&mut self, description: DatasetDescription) -> Result<()> {
        // One epoch is the most a measuring pass will ever need.
        self.core.bind(description, Epochs::Finite(1))?;
        self.cached = Some(self.core.metadata()?.clone());
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.core.shutdown()
    }

    fn state(&self) -> LifecycleState {
        self.core.state()
    }
}
