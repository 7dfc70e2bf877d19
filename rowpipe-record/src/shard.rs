//! Single-shard record file writer and reader

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use tracing::debug;

use rowpipe_core::{Result, Row, RowSchema};

use crate::frame;

/// Shard file name for one slot of a shard set
///
/// Follows the `{base}-{index:05}-of-{total:05}` convention, so a set
/// of three shards for `train` is `train-00000-of-00003` through
/// `train-00002-of-00003`.
pub fn shard_file_name(base: &str, index: usize, total: usize) -> String {
    format!("{}-{:05}-of-{:05}", base, index, total)
}

/// Options for reading a shard file
#[derive(Debug, Clone)]
pub struct RecordReaderOptions {
    /// Whether to read through a memory mapping
    pub use_memory_mapping: bool,

    /// Buffer size for streamed reads
    pub buffer_size: usize,
}

impl Default for RecordReaderOptions {
    fn default() -> Self {
        Self {
            use_memory_mapping: true,
            buffer_size: 64 * 1024, // 64KB
        }
    }
}

/// Writes one shard of length-prefixed records
pub struct RecordFileWriter {
    /// Path of the shard file
    path: PathBuf,

    /// Buffered file writer
    writer: BufWriter<File>,

    /// Rows written so far
    rows: u64,

    /// Bytes written so far
    bytes: u64,
}

impl RecordFileWriter {
    /// Create a shard file, truncating any existing file at the path
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            rows: 0,
            bytes: 0,
        })
    }

    /// Append one row to the shard
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.bytes += frame::write_record(&mut self.writer, row.columns())?;
        self.rows += 1;
        Ok(())
    }

    /// Get the path of the shard file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the number of rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush buffered records to the file
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush, sync, and close the shard; returns the row count
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        debug!(path = %self.path.display(), rows = self.rows, bytes = self.bytes, "shard finished");
        Ok(self.rows)
    }
}

enum ReaderBackend {
    Buffered(BufReader<File>),
    Mapped { mmap: Mmap, offset: usize },
    Empty,
}

/// Reads one shard of length-prefixed records back into rows
pub struct RecordFileReader {
    backend: ReaderBackend,
    schema: Arc<RowSchema>,
    rows_read: u64,
}

impl RecordFileReader {
    /// Open a shard file for reading
    pub fn open<P: AsRef<Path>>(
        path: P,
        schema: Arc<RowSchema>,
        options: RecordReaderOptions,
    ) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let file_size = file.metadata()?.len();

        // A zero-length file cannot be mapped.
        let backend = if file_size == 0 {
            ReaderBackend::Empty
        } else if options.use_memory_mapping {
            let mmap = unsafe { Mmap::map(&file)? };
            ReaderBackend::Mapped { mmap, offset: 0 }
        } else {
            ReaderBackend::Buffered(BufReader::with_capacity(options.buffer_size, file))
        };

        Ok(Self {
            backend,
            schema,
            rows_read: 0,
        })
    }

    /// Read the next row; `None` when the shard is exhausted
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        let columns = match &mut self.backend {
            ReaderBackend::Buffered(reader) => frame::read_record(reader)?,
            ReaderBackend::Mapped { mmap, offset } => {
                match frame::decode_record(&mmap[..], *offset)? {
                    Some((columns, next)) => {
                        *offset = next;
                        Some(columns)
                    }
                    None => None,
                }
            }
            ReaderBackend::Empty => None,
        };

        match columns {
            Some(columns) => {
                let row = Row::new(self.schema.clone(), columns)?;
                self.rows_read += 1;
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Get the number of rows read so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl Iterator for RecordFileReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}
