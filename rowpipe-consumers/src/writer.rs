//! Bulk persistence of a pipeline into a sharded record dataset

use std::path::PathBuf;

use tracing::{debug, info};

use rowpipe_core::{DatasetDescription, Epochs, Error, Pull, Result};
use rowpipe_record::{ShardManifest, ShardSetWriter};

use crate::consumer::{Consumer, ConsumerCore, LifecycleState};

/// The one shard format the bulk writer knows how to produce
pub const DEFAULT_DATASET_TYPE: &str = "mindrecord";

/// Configuration for [`BulkWriterConsumer`]
#[derive(Debug, Clone)]
pub struct BulkWriterOptions {
    /// Dataset path prefix the shard files and manifest hang off
    pub dataset_path: PathBuf,

    /// Number of shard files to spread rows across
    pub num_files: usize,

    /// Format tag recorded in the manifest
    pub dataset_type: String,

    /// Epoch budget drained by `write()`
    pub epochs: Epochs,
}

impl BulkWriterOptions {
    /// Create options for the given dataset path prefix
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            num_files: 1,
            dataset_type: DEFAULT_DATASET_TYPE.to_string(),
            epochs: Epochs::Finite(1),
        }
    }

    /// Set the number of shard files
    pub fn with_num_files(mut self, num_files: usize) -> Self {
        self.num_files = num_files;
        self
    }

    /// Set the format tag
    pub fn with_dataset_type(mut self, dataset_type: impl Into<String>) -> Self {
        self.dataset_type = dataset_type.into();
        self
    }

    /// Set the epoch budget
    pub fn with_epochs(mut self, epochs: Epochs) -> Self {
        self.epochs = epochs;
        self
    }
}

/// Drains an execution tree to disk as a sharded record dataset
///
/// Rows are spread round-robin: row `i` of the stream lands in shard
/// `i % num_files`, so a given dataset and shard count always produce
/// the same layout. The manifest is written only after every shard has
/// been finalized; a directory without one holds a partial write.
pub struct BulkWriterConsumer {
    /// Shared lifecycle and tree ownership
    core: ConsumerCore,

    /// Write configuration
    options: BulkWriterOptions,

    /// Whether `write()` has ever run
    write_started: bool,

    /// Manifest of the completed write
    manifest: Option<ShardManifest>,
}

impl BulkWriterConsumer {
    /// Create a bulk writer with the given options
    pub fn new(options: BulkWriterOptions) -> Self {
        Self {
            core: ConsumerCore::new("bulk_writer"),
            options,
            write_started: false,
            manifest: None,
        }
    }

    /// Drain the tree into the shard set and finalize the manifest
    ///
    /// Blocking; returns the number of rows persisted. A consumer
    /// writes at most once, whether or not the attempt completes; the
    /// shard files of a failed attempt are left exactly as the failure
    /// left them. On failure the manifest is withheld and the error
    /// carries the count of rows already on disk.
    pub fn write(&mut self) -> Result<u64> {
        if self.write_started {
            return Err(Error::InvalidOperation(
                "bulk write already ran; it cannot be retried".to_string(),
            ));
        }

        let schema = self.core.schema()?;
        self.write_started = true;
        let mut shards = ShardSetWriter::create(
            &self.options.dataset_path,
            self.options.num_files,
            &self.options.dataset_type,
            schema,
        )?;

        loop {
            match self.core.tree_mut()?.pull() {
                Ok(Pull::Row(row)) => {
                    if let Err(e) = shards.write_row(&row) {
                        return Err(partial(shards, e));
                    }
                }
                Ok(Pull::EpochEnd) => {
                    debug!(rows = shards.rows_written(), "epoch drained");
                }
                Ok(Pull::EndOfData) => break,
                Err(e) => return Err(partial(shards, e)),
            }
        }

        let written = shards.rows_written();
        let manifest = match shards.finish() {
            Ok(manifest) => manifest,
            Err(e) => {
                return Err(Error::PartialWrite {
                    written,
                    message: e.to_string(),
                })
            }
        };

        info!(
            rows = written,
            shards = manifest.num_shards(),
            path = %self.options.dataset_path.display(),
            "bulk write complete"
        );
        self.core.mark_draining();
        self.manifest = Some(manifest);
        Ok(written)
    }

    /// Manifest of the completed write, once `write()` has succeeded
    pub fn manifest(&self) -> Option<&ShardManifest> {
        self.manifest.as_ref()
    }
}

impl Consumer for BulkWriterConsumer {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn initialize(&mut self, description: DatasetDescription) -> Result<()> {
        if self.options.dataset_type != DEFAULT_DATASET_TYPE {
            return Err(Error::NotImplemented(format!(
                "dataset type \"{}\" is not supported; only \"{DEFAULT_DATASET_TYPE}\" \
                 shard sets can be written",
                self.options.dataset_type
            )));
        }
        if self.options.num_files == 0 {
            return Err(Error::Build("num_files must be at least 1".to_string()));
        }
        if self.options.epochs == Epochs::Unbounded {
            return Err(Error::Build(
                "an unbounded stream cannot be bulk written".to_string(),
            ));
        }
        self.core.bind(description, self.options.epochs)
    }

    fn shutdown(&mut self) -> Result<()> {
        self.core.shutdown()
    }

    fn state(&self) -> LifecycleState {
        self.core.state()
    }
}

/// Give up on a shard set, keeping what is already durable
fn partial(mut shards: ShardSetWriter, cause: Error) -> Error {
    shards.flush_best_effort();
    Error::PartialWrite {
        written: shards.rows_written(),
        message: cause.to_string(),
    }
}
