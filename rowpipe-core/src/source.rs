//! Row source seam between external readers and execution trees

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::row::Row;
use crate::schema::RowSchema;

/// Declared row count of a source, per pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// Exactly this many rows per pass
    Exact(usize),

    /// Finite, but not known without a pass
    Unknown,

    /// The source never exhausts on its own
    Unbounded,
}

/// A source of rows for an execution tree
///
/// This is the seam where reader implementations plug in. A source
/// produces one pass of rows, reports `None` when the pass is done, and
/// can be rewound with [`RowSource::reset`] for the next pass.
pub trait RowSource: Send {
    /// Get the schema of rows this source produces
    fn schema(&self) -> Arc<RowSchema>;

    /// Retrieve the next row; `None` when the current pass is exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;

    /// Rewind the source to the start of a fresh pass
    fn reset(&mut self) -> Result<()>;

    /// Declared row count per pass
    fn cardinality(&self) -> Cardinality {
        Cardinality::Unknown
    }

    /// Number of label classes, when the source knows it
    fn num_classes(&self) -> Option<usize> {
        None
    }
}

/// An in-memory row source
pub struct VecSource {
    /// Schema shared by every row
    schema: Arc<RowSchema>,

    /// Rows replayed on every pass
    rows: Vec<Row>,

    /// Position within the current pass
    position: usize,

    /// Declared number of label classes
    classes: Option<usize>,
}

impl VecSource {
    /// Create a new in-memory source
    pub fn new(schema: Arc<RowSchema>, rows: Vec<Row>) -> Result<Self> {
        for row in &rows {
            if row.schema().as_ref() != schema.as_ref() {
                return Err(Error::SchemaMismatch(
                    "row schema does not match the source schema".into(),
                ));
            }
        }

        Ok(Self {
            schema,
            rows,
            position: 0,
            classes: None,
        })
    }

    /// Declare the number of label classes this source covers
    pub fn with_num_classes(mut self, classes: usize) -> Self {
        self.classes = Some(classes);
        self
    }
}

impl RowSource for VecSource {
    fn schema(&self) -> Arc<RowSchema> {
        self.schema.clone()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.position >= self.rows.len() {
            return Ok(None);
        }

        let row = self.rows[self.position].clone();
        self.position += 1;

        Ok(Some(row))
    }

    fn reset(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn cardinality(&self) -> Cardinality {
        Cardinality::Exact(self.rows.len())
    }

    fn num_classes(&self) -> Option<usize> {
        self.classes
    }
}
