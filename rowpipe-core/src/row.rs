//! Materialized rows flowing out of an execution tree

use std::collections::HashMap;
use std::sync::Arc;

use static_assertions::assert_impl_all;

use crate::error::{Error, Result};
use crate::schema::RowSchema;
use crate::tensor::Tensor;

/// A single materialized row
///
/// Columns are validated against the schema once, at construction.
/// Every accessor that hands tensors out moves them; a row's buffers are
/// never shared between the tree and the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Schema shared by every row of the same tree
    schema: Arc<RowSchema>,

    /// Column values in schema order
    columns: Vec<Tensor>,
}

impl Row {
    /// Create a new row, validating the columns against the schema
    pub fn new(schema: Arc<RowSchema>, columns: Vec<Tensor>) -> Result<Self> {
        if columns.len() != schema.len() {
            return Err(Error::SchemaMismatch(format!(
                "schema has {} columns, row has {}",
                schema.len(),
                columns.len()
            )));
        }

        for (spec, tensor) in schema.columns().iter().zip(columns.iter()) {
            if tensor.dtype() != spec.dtype {
                return Err(Error::TypeMismatch(format!(
                    "column '{}' declared {}, got {}",
                    spec.name,
                    spec.dtype,
                    tensor.dtype()
                )));
            }
            if !spec.shape.is_compatible(tensor.shape()) {
                return Err(Error::SchemaMismatch(format!(
                    "column '{}' declared shape {}, got {:?}",
                    spec.name,
                    spec.shape,
                    tensor.shape()
                )));
            }
        }

        Ok(Self { schema, columns })
    }

    /// Get the schema of this row
    pub fn schema(&self) -> &Arc<RowSchema> {
        &self.schema
    }

    /// Get the columns in natural order
    pub fn columns(&self) -> &[Tensor] {
        &self.columns
    }

    /// Get a column by index
    pub fn column(&self, index: usize) -> &Tensor {
        &self.columns[index]
    }

    /// Get the first column with the given name
    pub fn column_by_name(&self, name: &str) -> Result<&Tensor> {
        let index = self.schema.index_of(name)?;
        Ok(&self.columns[index])
    }

    /// Get the number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Consume the row, handing the columns out in natural order
    pub fn into_columns(self) -> Vec<Tensor> {
        self.columns
    }

    /// Consume the row into a name-keyed mapping
    ///
    /// Fails with [`Error::DuplicateColumnName`] before any entry is
    /// built when two columns share a name.
    pub fn into_mapping(self) -> Result<HashMap<String, Tensor>> {
        if let Some(name) = self.schema.duplicate_name() {
            return Err(Error::DuplicateColumnName(name.to_string()));
        }

        let names = self.schema.names();
        Ok(names.into_iter().zip(self.columns).collect())
    }
}

assert_impl_all!(Row: Send, Sync);
