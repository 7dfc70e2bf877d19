//! Round-robin fan-out across a fixed set of shard files

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use rowpipe_core::{Error, Result, Row, RowSchema};

use crate::manifest::{ShardEntry, ShardManifest, MANIFEST_VERSION};
use crate::shard::{shard_file_name, RecordFileWriter};

/// Writes rows across a fixed set of shards and finalizes a manifest
///
/// Rows are distributed round-robin: row `i` of the stream lands in
/// shard `i % num_files`. The assignment is deterministic and stable
/// for a given stream order, and shard sizes differ by at most one row.
pub struct ShardSetWriter {
    /// Dataset path prefix the shards hang off
    prefix: PathBuf,

    /// Record format tag recorded in the manifest
    format: String,

    /// Schema of every row in the set
    schema: Arc<RowSchema>,

    /// Id stamped into the manifest
    dataset_id: Uuid,

    /// Shard file names in index order
    file_names: Vec<String>,

    /// One writer per shard
    writers: Vec<RecordFileWriter>,

    /// Shard that receives the next row
    next_shard: usize,

    /// Rows accepted so far
    rows_written: u64,
}

impl ShardSetWriter {
    /// Create the shard files for a dataset path prefix
    ///
    /// The prefix must end in a file name component; its parent
    /// directories are created when absent.
    pub fn create(
        prefix: &Path,
        num_files: usize,
        format: &str,
        schema: Arc<RowSchema>,
    ) -> Result<Self> {
        if num_files == 0 {
            return Err(Error::Build("shard count must be at least 1".into()));
        }

        let base = prefix
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::Build("dataset path must end in a valid file name".into()))?
            .to_string();

        if let Some(parent) = prefix.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file_names = Vec::with_capacity(num_files);
        let mut writers = Vec::with_capacity(num_files);
        for index in 0..num_files {
            let name = shard_file_name(&base, index, num_files);
            let path = match prefix.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.join(&name),
                _ => PathBuf::from(&name),
            };
            writers.push(RecordFileWriter::create(path)?);
            file_names.push(name);
        }

        Ok(Self {
            prefix: prefix.to_path_buf(),
            format: format.to_string(),
            schema,
            dataset_id: Uuid::new_v4(),
            file_names,
            writers,
            next_shard: 0,
            rows_written: 0,
        })
    }

    /// Append one row to the set
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.writers[self.next_shard].write_row(row)?;
        self.next_shard = (self.next_shard + 1) % self.writers.len();
        self.rows_written += 1;
        Ok(())
    }

    /// Get the number of rows accepted so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush every shard's buffered records
    pub fn flush(&mut self) -> Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flush on a failed write so the partial row count is durable
    ///
    /// Errors are logged and swallowed; the caller is already on an
    /// error path and the original failure is what must surface.
    pub fn flush_best_effort(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, prefix = %self.prefix.display(), "failed to flush partial shards");
        }
    }

    /// Finish every shard and write the manifest
    pub fn finish(self) -> Result<ShardManifest> {
        let ShardSetWriter {
            prefix,
            format,
            schema,
            dataset_id,
            file_names,
            writers,
            rows_written,
            ..
        } = self;

        let mut shards = Vec::with_capacity(writers.len());
        for (file_name, writer) in file_names.into_iter().zip(writers) {
            let rows = writer.finish()?;
            shards.push(ShardEntry { file_name, rows });
        }

        let manifest = ShardManifest {
            version: MANIFEST_VERSION,
            dataset_id,
            format,
            schema: schema.as_ref().clone(),
            shards,
            total_rows: rows_written,
        };
        let manifest_path = manifest.save(&prefix)?;

        info!(
            path = %manifest_path.display(),
            shards = manifest.num_shards(),
            rows = manifest.total_rows,
            "shard set finished"
        );

        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shard::RecordReaderOptions;
    use proptest::prelude::*;
    use rowpipe_core::{ColumnSpec, DataType, Tensor, TensorShape};

    fn scalar_schema() -> Arc<RowSchema> {
        Arc::new(RowSchema::new(vec![ColumnSpec::new(
            "data",
            DataType::Int32,
            TensorShape::scalar(),
        )]))
    }

    fn scalar_row(schema: &Arc<RowSchema>, value: i32) -> Row {
        Row::new(schema.clone(), vec![Tensor::scalar(value)]).unwrap()
    }

    fn shard_values(
        manifest: &ShardManifest,
        prefix: &Path,
        index: usize,
    ) -> Vec<i32> {
        manifest
            .open_shard(prefix, index, RecordReaderOptions::default())
            .unwrap()
            .map(|row| row.unwrap().column(0).to_vec::<i32>().unwrap()[0])
            .collect()
    }

    #[test]
    fn test_round_robin_assignment() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("train");
        let schema = scalar_schema();

        let mut set = ShardSetWriter::create(&prefix, 3, "mindrecord", schema.clone()).unwrap();
        for value in 1..=10 {
            set.write_row(&scalar_row(&schema, value)).unwrap();
        }
        let manifest = set.finish().unwrap();

        assert_eq!(manifest.total_rows, 10);
        assert_eq!(manifest.num_shards(), 3);
        assert_eq!(
            manifest.shards.iter().map(|s| s.rows).collect::<Vec<_>>(),
            vec![4, 3, 3]
        );

        // Row i lands in shard i % 3.
        assert_eq!(shard_values(&manifest, &prefix, 0), vec![1, 4, 7, 10]);
        assert_eq!(shard_values(&manifest, &prefix, 1), vec![2, 5, 8]);
        assert_eq!(shard_values(&manifest, &prefix, 2), vec![3, 6, 9]);
    }

    #[test]
    fn test_manifest_reloads_after_finish() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("train");
        let schema = scalar_schema();

        let mut set = ShardSetWriter::create(&prefix, 2, "mindrecord", schema.clone()).unwrap();
        for value in 0..4 {
            set.write_row(&scalar_row(&schema, value)).unwrap();
        }
        let manifest = set.finish().unwrap();

        let reloaded = ShardManifest::load(&prefix).unwrap();
        assert_eq!(reloaded, manifest);
    }

    #[test]
    fn test_zero_shards_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("train");
        let result = ShardSetWriter::create(&prefix, 0, "mindrecord", scalar_schema());
        assert!(matches!(result, Err(Error::Build(_))));
    }

    #[test]
    fn test_no_manifest_until_finish() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("train");
        let schema = scalar_schema();

        let mut set = ShardSetWriter::create(&prefix, 1, "mindrecord", schema.clone()).unwrap();
        set.write_row(&scalar_row(&schema, 1)).unwrap();

        assert!(ShardManifest::load(&prefix).is_err());
        set.finish().unwrap();
        assert!(ShardManifest::load(&prefix).is_ok());
    }

    proptest! {
        #[test]
        fn prop_shards_balanced_within_one_row(rows in 0usize..80, shards in 1usize..8) {
            let dir = tempfile::tempdir().unwrap();
            let prefix = dir.path().join("set");
            let schema = scalar_schema();

            let mut set = ShardSetWriter::create(&prefix, shards, "mindrecord", schema.clone()).unwrap();
            for value in 0..rows {
                set.write_row(&scalar_row(&schema, value as i32)).unwrap();
            }
            let manifest = set.finish().unwrap();

            let counts: Vec<u64> = manifest.shards.iter().map(|s| s.rows).collect();
            prop_assert_eq!(counts.iter().sum::<u64>(), rows as u64);
            let max = counts.iter().max().copied().unwrap_or(0);
            let min = counts.iter().min().copied().unwrap_or(0);
            prop_assert!(max - min <= 1);
            for (index, count) in counts.iter().enumerate() {
                let expected = (rows / shards + usize::from(index < rows % shards)) as u64;
                prop_assert_eq!(*count, expected);
            }
        }
    }
}
