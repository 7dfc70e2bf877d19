//! Sharded record-file persistence for pipeline rows
//!
//! This crate provides the storage layer bulk writes land in: a set of
//! length-prefixed record shards plus a JSON manifest that marks the
//! set complete and carries its accounting.

pub mod frame;
pub mod manifest;
pub mod shard;
pub mod writer;

pub use manifest::{ShardEntry, ShardManifest, MANIFEST_VERSION};
pub use shard::{shard_file_name, RecordFileReader, RecordFileWriter, RecordReaderOptions};
pub use writer::ShardSetWriter;

// Re-export core types
pub use rowpipe_core::{Error, Result, Row, RowSchema};
