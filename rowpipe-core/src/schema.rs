//! Schema definitions for tensor-valued rows

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Element type of a tensor column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean stored as one byte per value
    Boolean,

    /// 8-bit signed integer
    Int8,

    /// 16-bit signed integer
    Int16,

    /// 32-bit signed integer
    Int32,

    /// 64-bit signed integer
    Int64,

    /// 8-bit unsigned integer
    UInt8,

    /// 16-bit unsigned integer
    UInt16,

    /// 32-bit unsigned integer
    UInt32,

    /// 64-bit unsigned integer
    UInt64,

    /// 32-bit floating point
    Float32,

    /// 64-bit floating point
    Float64,
}

impl DataType {
    /// Get the size of one element of this type in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Boolean | DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 4,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Int8 => write!(f, "Int8"),
            DataType::Int16 => write!(f, "Int16"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::UInt8 => write!(f, "UInt8"),
            DataType::UInt16 => write!(f, "UInt16"),
            DataType::UInt32 => write!(f, "UInt32"),
            DataType::UInt64 => write!(f, "UInt64"),
            DataType::Float32 => write!(f, "Float32"),
            DataType::Float64 => write!(f, "Float64"),
        }
    }
}

/// A single dimension of a declared tensor shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    /// Extent is the same for every row
    Fixed(usize),

    /// Extent may vary from row to row
    Dynamic,
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(extent) => write!(f, "{}", extent),
            Dim::Dynamic => write!(f, "?"),
        }
    }
}

/// Declared shape of a tensor column
///
/// Concrete row shapes may differ from the declaration only along
/// dimensions marked [`Dim::Dynamic`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorShape {
    /// Dimensions in row-major order
    dims: Vec<Dim>,
}

impl TensorShape {
    /// Create a shape from explicit dimensions
    pub fn new(dims: Vec<Dim>) -> Self {
        Self { dims }
    }

    /// Create a fully fixed shape
    pub fn fixed(extents: &[usize]) -> Self {
        Self {
            dims: extents.iter().map(|&e| Dim::Fixed(e)).collect(),
        }
    }

    /// Create the scalar (rank zero) shape
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    /// Get the dimensions of this shape
    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// Get the number of dimensions
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Check whether a concrete shape satisfies this declaration
    pub fn is_compatible(&self, concrete: &[usize]) -> bool {
        if self.dims.len() != concrete.len() {
            return false;
        }

        self.dims.iter().zip(concrete.iter()).all(|(dim, &extent)| match dim {
            Dim::Fixed(declared) => *declared == extent,
            Dim::Dynamic => true,
        })
    }

    /// Number of elements when every dimension is fixed
    pub fn fixed_element_count(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |count, dim| match dim {
            Dim::Fixed(extent) => Some(count * extent),
            Dim::Dynamic => None,
        })
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", dim)?;
        }
        write!(f, ")")
    }
}

/// A column in a row schema, with a name, element type, and declared shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Name of the column
    pub name: String,

    /// Element type of the column
    pub dtype: DataType,

    /// Declared shape of the column
    pub shape: TensorShape,
}

impl ColumnSpec {
    /// Create a new column spec
    pub fn new(name: &str, dtype: DataType, shape: TensorShape) -> Self {
        Self {
            name: name.to_string(),
            dtype,
            shape,
        }
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.name, self.dtype, self.shape)
    }
}

/// A schema describing the rows an execution tree produces
///
/// Column names are not required to be unique; trees assembled from
/// arbitrary upstream operators can legally produce colliding names.
/// Name-keyed access resolves to the first column with that name, and
/// [`RowSchema::duplicate_name`] reports collisions so consumers that
/// re-key rows by name can refuse up front.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSchema {
    /// Columns in natural order
    columns: Vec<ColumnSpec>,

    /// First index of each column name for faster lookup
    #[serde(skip)]
    column_indices: HashMap<String, usize>,
}

impl RowSchema {
    /// Create a new schema with the given columns
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        let mut column_indices = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            column_indices.entry(column.name.clone()).or_insert(i);
        }

        Self {
            columns,
            column_indices,
        }
    }

    /// Get all columns in this schema
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Get a column by index
    pub fn column(&self, index: usize) -> &ColumnSpec {
        &self.columns[index]
    }

    /// Get the index of the first column with the given name
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.column_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::SchemaMismatch(format!("column not found: {}", name)))
    }

    /// Get the number of columns in this schema
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if this schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get the column names in natural order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Get the first name that appears more than once, if any
    pub fn duplicate_name(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Some(column.name.as_str());
            }
        }
        None
    }

    /// Serialize this schema to a binary format
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::Serialization)
    }

    /// Deserialize a schema from a binary format
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(Error::Serialization)
    }
}

// Deserialization rebuilds the name index instead of trusting the payload.
impl<'de> Deserialize<'de> for RowSchema {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct SchemaDoc {
            columns: Vec<ColumnSpec>,
        }

        let doc = SchemaDoc::deserialize(deserializer)?;
        Ok(RowSchema::new(doc.columns))
    }
}

impl fmt::Display for RowSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RowSchema: {} columns", self.columns.len())?;
        for column in &self.columns {
            writeln!(f, "  {}", column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> RowSchema {
        RowSchema::new(vec![
            ColumnSpec::new("image", DataType::UInt8, TensorShape::fixed(&[2, 2])),
            ColumnSpec::new("label", DataType::Int32, TensorShape::scalar()),
        ])
    }

    #[test]
    fn test_index_of_resolves_first_match() {
        let schema = RowSchema::new(vec![
            ColumnSpec::new("a", DataType::Int32, TensorShape::scalar()),
            ColumnSpec::new("b", DataType::Int32, TensorShape::scalar()),
            ColumnSpec::new("a", DataType::Float32, TensorShape::scalar()),
        ]);

        assert_eq!(schema.index_of("a").unwrap(), 0);
        assert_eq!(schema.index_of("b").unwrap(), 1);
        assert!(schema.index_of("c").is_err());
    }

    #[test]
    fn test_duplicate_name_detection() {
        assert_eq!(sample_schema().duplicate_name(), None);

        let dup = RowSchema::new(vec![
            ColumnSpec::new("x", DataType::Int32, TensorShape::scalar()),
            ColumnSpec::new("y", DataType::Int32, TensorShape::scalar()),
            ColumnSpec::new("x", DataType::Int32, TensorShape::scalar()),
        ]);
        assert_eq!(dup.duplicate_name(), Some("x"));
    }

    #[test]
    fn test_shape_compatibility() {
        let declared = TensorShape::new(vec![Dim::Fixed(3), Dim::Dynamic, Dim::Fixed(2)]);

        assert!(declared.is_compatible(&[3, 7, 2]));
        assert!(declared.is_compatible(&[3, 0, 2]));
        assert!(!declared.is_compatible(&[3, 7, 4]));
        assert!(!declared.is_compatible(&[3, 7]));

        assert!(TensorShape::scalar().is_compatible(&[]));
        assert_eq!(declared.fixed_element_count(), None);
        assert_eq!(TensorShape::fixed(&[3, 2]).fixed_element_count(), Some(6));
    }

    #[test]
    fn test_shape_display() {
        let shape = TensorShape::new(vec![Dim::Fixed(3), Dim::Dynamic, Dim::Fixed(2)]);
        assert_eq!(shape.to_string(), "(3, ?, 2)");
        assert_eq!(TensorShape::scalar().to_string(), "()");
    }

    #[test]
    fn test_binary_round_trip_rebuilds_indices() {
        let schema = sample_schema();
        let bytes = schema.serialize().unwrap();
        let restored = RowSchema::deserialize(&bytes).unwrap();

        assert_eq!(restored, schema);
        assert_eq!(restored.index_of("label").unwrap(), 1);
    }

    #[test]
    fn test_json_round_trip() {
        let schema = sample_schema();
        let json = serde_json::to_string(&schema).unwrap();
        let restored: RowSchema = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, schema);
        assert_eq!(restored.index_of("image").unwrap(), 0);
    }
}
