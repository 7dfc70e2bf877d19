//! JSON manifest describing a completed shard set
//!
//! The manifest is written once, after every shard has been finished,
//! and is therefore the marker that a persisted dataset is complete. A
//! shard set without a readable manifest must be treated as partial.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rowpipe_core::{Error, Result, RowSchema};

use crate::shard::{RecordFileReader, RecordReaderOptions};

/// Current manifest format version
pub const MANIFEST_VERSION: u32 = 1;

/// One shard of a persisted dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardEntry {
    /// Shard file name, relative to the manifest's directory
    pub file_name: String,

    /// Rows persisted in this shard
    pub rows: u64,
}

/// Sidecar document describing a completed shard set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardManifest {
    /// Manifest format version
    pub version: u32,

    /// Unique id of this persisted dataset
    pub dataset_id: Uuid,

    /// Record format tag the dataset was written as
    pub format: String,

    /// Schema of every persisted row
    pub schema: RowSchema,

    /// Shards in index order
    pub shards: Vec<ShardEntry>,

    /// Total rows across all shards
    pub total_rows: u64,
}

impl ShardManifest {
    /// Manifest file path for a dataset path prefix
    pub fn path_for(prefix: &Path) -> PathBuf {
        let mut name = OsString::from(prefix.as_os_str());
        name.push(".manifest.json");
        PathBuf::from(name)
    }

    /// Write this manifest next to its shards
    pub fn save(&self, prefix: &Path) -> Result<PathBuf> {
        let path = Self::path_for(prefix);
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(path)
    }

    /// Load the manifest for a dataset path prefix
    pub fn load(prefix: &Path) -> Result<Self> {
        let path = Self::path_for(prefix);
        let file = File::open(path)?;
        let manifest: Self = serde_json::from_reader(BufReader::new(file))?;
        Ok(manifest)
    }

    /// Get the number of shards
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Open one shard of this manifest for reading
    pub fn open_shard(
        &self,
        prefix: &Path,
        index: usize,
        options: RecordReaderOptions,
    ) -> Result<RecordFileReader> {
        let entry = self.shards.get(index).ok_or_else(|| {
            Error::Build(format!(
                "shard index {} out of range for {} shards",
                index,
                self.shards.len()
            ))
        })?;

        let path = match prefix.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(&entry.file_name),
            _ => PathBuf::from(&entry.file_name),
        };

        RecordFileReader::open(path, Arc::new(self.schema.clone()), options)
    }
}
