//! Execution tree contract and the source-backed tree implementation

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;
use tracing::debug;

use crate::error::{Error, Result};
use crate::row::Row;
use crate::schema::{DataType, RowSchema, TensorShape};
use crate::source::{Cardinality, RowSource};

/// Outcome of a single pull against an execution tree
///
/// Control flow is never conflated with data: an epoch boundary and the
/// permanent end of the stream are their own variants, not sentinel
/// rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Pull<T> {
    /// A materialized item
    Row(T),

    /// Boundary between two logical epochs
    EpochEnd,

    /// The tree is permanently exhausted
    EndOfData,
}

impl<T> Pull<T> {
    /// Check whether this outcome carries an item
    pub fn is_row(&self) -> bool {
        matches!(self, Pull::Row(_))
    }

    /// Check whether this outcome is the permanent end of the stream
    pub fn is_end(&self) -> bool {
        matches!(self, Pull::EndOfData)
    }

    /// Extract the item, if any
    pub fn into_row(self) -> Option<T> {
        match self {
            Pull::Row(item) => Some(item),
            _ => None,
        }
    }
}

/// Epoch budget for a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Epochs {
    /// Run exactly this many epochs, then end the stream
    Finite(u32),

    /// Restart the pipeline forever
    Unbounded,
}

impl Epochs {
    /// Number of epochs when the budget is finite
    pub fn count(&self) -> Option<u32> {
        match self {
            Epochs::Finite(n) => Some(*n),
            Epochs::Unbounded => None,
        }
    }
}

/// Maps the conventional epoch-count integer, where `-1` means unbounded
impl TryFrom<i32> for Epochs {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            -1 => Ok(Epochs::Unbounded),
            n if n >= 1 => Ok(Epochs::Finite(n as u32)),
            n => Err(Error::Build(format!(
                "epoch count must be -1 or at least 1, got {}",
                n
            ))),
        }
    }
}

/// Statically queryable shape of a bound execution tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Rows produced per epoch, when statically known
    pub rows_per_epoch: Option<usize>,

    /// Batch size declared by the pipeline
    pub batch_size: usize,

    /// Passes over the source per epoch
    pub repeat_count: usize,

    /// Number of label classes, when declared
    pub num_classes: Option<usize>,

    /// Declared cardinality of the root source
    pub cardinality: Cardinality,

    /// Output column names in natural order
    pub output_names: Vec<String>,

    /// Output element types in natural order
    pub output_types: Vec<DataType>,

    /// Declared output shapes in natural order
    pub output_shapes: Vec<TensorShape>,
}

/// A compiled, lazily evaluated operator tree
///
/// Exactly one consumer owns a tree. Pulls are blocking and strictly
/// sequential; the tree reports epoch boundaries and exhaustion through
/// [`Pull`], and keeps reporting [`Pull::EndOfData`] once it is done.
pub trait ExecutionTree: Send {
    /// Start producing rows; idempotent once launched
    fn launch(&mut self) -> Result<()>;

    /// Pull the next outcome
    ///
    /// Fails with [`Error::NotStarted`] when the tree was never
    /// launched.
    fn pull(&mut self) -> Result<Pull<Row>>;

    /// Request teardown; idempotent
    fn stop(&mut self) -> Result<()>;

    /// Get the schema of the rows this tree produces
    fn schema(&self) -> Arc<RowSchema>;

    /// Get the static shape of this pipeline
    fn metadata(&self) -> &PipelineMetadata;
}

/// An executable tree that replays a row source
///
/// One epoch is `repeat_count` passes over the source. The tree emits
/// [`Pull::EpochEnd`] after every completed epoch, including the last
/// one of a finite budget, and [`Pull::EndOfData`] from then on.
pub struct SourceTree {
    /// Root source feeding the tree
    source: Box<dyn RowSource>,

    /// Schema cached at build time
    schema: Arc<RowSchema>,

    /// Static pipeline shape derived at build time
    metadata: PipelineMetadata,

    /// Epoch budget driven through this tree
    epochs: Epochs,

    /// Completed epochs
    epochs_done: u32,

    /// Completed passes within the current epoch
    passes_done: usize,

    /// Rows produced within the current epoch
    rows_this_epoch: usize,

    /// Whether `launch` has run
    launched: bool,

    /// Whether `stop` has run
    stopped: bool,

    /// Whether the budget is exhausted
    finished: bool,
}

impl SourceTree {
    /// Create a tree over a validated source
    pub fn new(source: Box<dyn RowSource>, metadata: PipelineMetadata, epochs: Epochs) -> Self {
        let schema = source.schema();
        Self {
            source,
            schema,
            metadata,
            epochs,
            epochs_done: 0,
            passes_done: 0,
            rows_this_epoch: 0,
            launched: false,
            stopped: false,
            finished: false,
        }
    }
}

impl ExecutionTree for SourceTree {
    fn launch(&mut self) -> Result<()> {
        if self.stopped {
            return Err(Error::InvalidOperation(
                "execution tree was already stopped".into(),
            ));
        }

        if !self.launched {
            self.launched = true;
            debug!(
                rows_per_epoch = ?self.metadata.rows_per_epoch,
                repeat = self.metadata.repeat_count,
                epochs = ?self.epochs.count(),
                "execution tree launched"
            );
        }

        Ok(())
    }

    fn pull(&mut self) -> Result<Pull<Row>> {
        if !self.launched {
            return Err(Error::NotStarted("execution tree was never launched".into()));
        }
        if self.stopped || self.finished {
            return Ok(Pull::EndOfData);
        }

        loop {
            if let Some(row) = self.source.next_row()? {
                self.rows_this_epoch += 1;
                return Ok(Pull::Row(row));
            }

            self.passes_done += 1;
            if self.passes_done < self.metadata.repeat_count {
                self.source.reset()?;
                continue;
            }

            // Epoch boundary
            let produced = self.rows_this_epoch;
            self.passes_done = 0;
            self.rows_this_epoch = 0;
            self.epochs_done = self.epochs_done.saturating_add(1);
            debug!(epoch = self.epochs_done, rows = produced, "epoch complete");

            return match self.epochs {
                Epochs::Finite(total) if self.epochs_done >= total => {
                    self.finished = true;
                    Ok(Pull::EpochEnd)
                }
                // An epoch that produced nothing would otherwise restart
                // forever without yielding a row.
                Epochs::Unbounded if produced == 0 => {
                    self.finished = true;
                    Ok(Pull::EndOfData)
                }
                _ => {
                    self.source.reset()?;
                    Ok(Pull::EpochEnd)
                }
            };
        }
    }

    fn stop(&mut self) -> Result<()> {
        if !self.stopped {
            self.stopped = true;
            debug!(epochs_done = self.epochs_done, "execution tree stopped");
        }
        Ok(())
    }

    fn schema(&self) -> Arc<RowSchema> {
        self.schema.clone()
    }

    fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }
}

assert_impl_all!(SourceTree: Send);
assert_impl_all!(Box<dyn ExecutionTree>: Send);
