//! Row-by-row iteration over an execution tree

use std::collections::HashMap;

use tracing::debug;

use rowpipe_core::{DatasetDescription, Epochs, Error, Pull, Result, Row, Tensor};

use crate::consumer::{Consumer, ConsumerCore, LifecycleState};

/// Pulls rows programmatically, one at a time
///
/// With a finite epoch budget of `n`, callers observe every row of each
/// epoch, a [`Pull::EpochEnd`] between epochs (including after the
/// last), and then [`Pull::EndOfData`] on every further call. With an
/// unbounded budget the boundaries are absorbed and the stream simply
/// never ends.
pub struct IteratorConsumer {
    /// Shared lifecycle and tree ownership
    core: ConsumerCore,

    /// Epoch budget the tree is bound with
    epochs: Epochs,

    /// Whether the mapping duplicate-name check has passed
    mapping_checked: bool,

    /// Whether an error fused the `Iterator` adapter
    iteration_failed: bool,
}

impl IteratorConsumer {
    /// Create an iterator consumer with the given epoch budget
    pub fn new(epochs: Epochs) -> Self {
        Self {
            core: ConsumerCore::new("iterator"),
            epochs,
            mapping_checked: false,
            iteration_failed: false,
        }
    }

    /// Create from the conventional epoch-count integer (`-1` = unbounded)
    pub fn with_num_epochs(num_epochs: i32) -> Result<Self> {
        Ok(Self::new(Epochs::try_from(num_epochs)?))
    }

    /// Pull the next outcome with columns in natural order
    pub fn next_row(&mut self) -> Result<Pull<Row>> {
        let absorb_markers = self.epochs == Epochs::Unbounded;

        loop {
            let outcome = self.core.tree_mut()?.pull();
            match outcome {
                Ok(Pull::Row(row)) => return Ok(Pull::Row(row)),
                Ok(Pull::EpochEnd) if absorb_markers => continue,
                Ok(Pull::EpochEnd) => return Ok(Pull::EpochEnd),
                Ok(Pull::EndOfData) => {
                    self.core.mark_draining();
                    return Ok(Pull::EndOfData);
                }
                Err(e) => {
                    return Err(Error::pipeline(
                        self.core.name(),
                        "next_row",
                        e.to_string(),
                    ))
                }
            }
        }
    }

    /// Pull the next outcome re-keyed by column name
    ///
    /// Fails with [`Error::DuplicateColumnName`] on the first call when
    /// the schema is ambiguous, before any row is consumed. The ordered
    /// [`IteratorConsumer::next_row`] remains usable on such a schema.
    pub fn next_row_mapped(&mut self) -> Result<Pull<HashMap<String, Tensor>>> {
        if !self.mapping_checked {
            let schema = self.core.schema()?;
            if let Some(name) = schema.duplicate_name() {
                debug!(consumer = self.core.name(), column = name, "ambiguous mapping refused");
                return Err(Error::DuplicateColumnName(name.to_string()));
            }
            self.mapping_checked = true;
        }

        match self.next_row()? {
            Pull::Row(row) => Ok(Pull::Row(row.into_mapping()?)),
            Pull::EpochEnd => Ok(Pull::EpochEnd),
            Pull::EndOfData => Ok(Pull::EndOfData),
        }
    }
}

impl Consumer for IteratorConsumer {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn initialize(&mut self, description: DatasetDescription) -> Result<()> {
        self.core.bind(description, self.epochs)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.core.shutdown()
    }

    fn state(&self) -> LifecycleState {
        self.core.state()
    }
}

/// Rows-only view of the stream; epoch boundaries are skipped
///
/// The adapter fuses after the first error.
impl Iterator for IteratorConsumer {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.iteration_failed {
            return None;
        }

        loop {
            match self.next_row() {
                Ok(Pull::Row(row)) => return Some(Ok(row)),
                Ok(Pull::EpochEnd) => continue,
                Ok(Pull::EndOfData) => return None,
                Err(e) => {
                    self.iteration_failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
