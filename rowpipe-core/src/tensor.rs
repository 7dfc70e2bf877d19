//! Owned tensor values exchanged between trees and consumers

use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

use crate::error::{Error, Result};
use crate::schema::DataType;

/// Rust element types that can back a tensor buffer
pub trait Element: Pod {
    /// Data type tag corresponding to this element type
    const DATA_TYPE: DataType;
}

impl Element for i8 {
    const DATA_TYPE: DataType = DataType::Int8;
}

impl Element for i16 {
    const DATA_TYPE: DataType = DataType::Int16;
}

impl Element for i32 {
    const DATA_TYPE: DataType = DataType::Int32;
}

impl Element for i64 {
    const DATA_TYPE: DataType = DataType::Int64;
}

impl Element for u8 {
    const DATA_TYPE: DataType = DataType::UInt8;
}

impl Element for u16 {
    const DATA_TYPE: DataType = DataType::UInt16;
}

impl Element for u32 {
    const DATA_TYPE: DataType = DataType::UInt32;
}

impl Element for u64 {
    const DATA_TYPE: DataType = DataType::UInt64;
}

impl Element for f32 {
    const DATA_TYPE: DataType = DataType::Float32;
}

impl Element for f64 {
    const DATA_TYPE: DataType = DataType::Float64;
}

/// An owned multi-dimensional value
///
/// A tensor owns its byte storage outright. Handing a tensor to a
/// consumer or a device channel moves the buffer; it is never aliased
/// between the tree and the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// Element type of the buffer
    dtype: DataType,

    /// Concrete extent of each dimension
    shape: Vec<usize>,

    /// Row-major element storage
    data: Vec<u8>,
}

impl Tensor {
    /// Create a tensor from a vector of elements and a concrete shape
    pub fn from_vec<T: Element>(values: Vec<T>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(Error::SchemaMismatch(format!(
                "shape {:?} expects {} elements, got {}",
                shape,
                expected,
                values.len()
            )));
        }

        Ok(Self {
            dtype: T::DATA_TYPE,
            shape: shape.to_vec(),
            data: bytemuck::cast_slice(&values).to_vec(),
        })
    }

    /// Create a rank-zero tensor holding a single element
    pub fn scalar<T: Element>(value: T) -> Self {
        Self {
            dtype: T::DATA_TYPE,
            shape: Vec::new(),
            data: bytemuck::bytes_of(&value).to_vec(),
        }
    }

    /// Create a boolean tensor, stored one byte per value
    pub fn from_bool_vec(values: Vec<bool>, shape: &[usize]) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(Error::SchemaMismatch(format!(
                "shape {:?} expects {} elements, got {}",
                shape,
                expected,
                values.len()
            )));
        }

        Ok(Self {
            dtype: DataType::Boolean,
            shape: shape.to_vec(),
            data: values.into_iter().map(u8::from).collect(),
        })
    }

    /// Get the element type of this tensor
    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Get the concrete shape of this tensor
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of dimensions
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Get the number of elements
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Get the size of the storage in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Get the raw byte storage
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Borrow the elements as a typed slice
    ///
    /// Fails with [`Error::TypeMismatch`] when `T` does not match the
    /// tensor's data type, or [`Error::LayoutError`] when the buffer is
    /// not aligned for `T`. [`Tensor::to_vec`] is the alignment-proof
    /// alternative.
    pub fn values<T: Element>(&self) -> Result<&[T]> {
        self.check_dtype::<T>()?;
        bytemuck::try_cast_slice(&self.data)
            .map_err(|e| Error::LayoutError(format!("tensor buffer cast failed: {}", e)))
    }

    /// Copy the elements out as a typed vector
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.check_dtype::<T>()?;
        let width = std::mem::size_of::<T>();
        Ok(self
            .data
            .chunks_exact(width)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if self.dtype != T::DATA_TYPE {
            return Err(Error::TypeMismatch(format!(
                "tensor holds {}, requested {}",
                self.dtype,
                T::DATA_TYPE
            )));
        }
        Ok(())
    }
}

assert_impl_all!(Tensor: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_from_vec_round_trip() {
        let tensor = Tensor::from_vec(vec![1i32, 2, 3, 4, 5, 6], &[2, 3]).unwrap();

        assert_eq!(tensor.dtype(), DataType::Int32);
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor.rank(), 2);
        assert_eq!(tensor.element_count(), 6);
        assert_eq!(tensor.size_bytes(), 24);
        assert_eq!(tensor.to_vec::<i32>().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_scalar() {
        let tensor = Tensor::scalar(7.5f64);

        assert_eq!(tensor.dtype(), DataType::Float64);
        assert_eq!(tensor.shape(), &[] as &[usize]);
        assert_eq!(tensor.element_count(), 1);
        assert_eq!(tensor.to_vec::<f64>().unwrap(), vec![7.5]);
    }

    #[test]
    fn test_shape_element_mismatch() {
        let result = Tensor::from_vec(vec![1i32, 2, 3], &[2, 2]);
        assert!(matches!(result, Err(Error::SchemaMismatch(_))));
    }

    #[test]
    fn test_typed_access_rejects_wrong_type() {
        let tensor = Tensor::from_vec(vec![1i32, 2], &[2]).unwrap();
        assert!(matches!(tensor.to_vec::<f32>(), Err(Error::TypeMismatch(_))));
        assert!(matches!(tensor.values::<i64>(), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_bool_tensor_stored_as_bytes() {
        let tensor = Tensor::from_bool_vec(vec![true, false, true], &[3]).unwrap();

        assert_eq!(tensor.dtype(), DataType::Boolean);
        assert_eq!(tensor.as_bytes(), &[1, 0, 1]);
    }

    #[test]
    fn test_serde_round_trip() {
        let tensor = Tensor::from_vec(vec![1u16, 2, 3], &[3]).unwrap();
        let bytes = bincode::serialize(&tensor).unwrap();
        let restored: Tensor = bincode::deserialize(&bytes).unwrap();

        assert_eq!(restored, tensor);
        assert_eq!(restored.to_vec::<u16>().unwrap(), vec![1, 2, 3]);
    }

    proptest! {
        #[test]
        fn prop_f32_round_trip(values in proptest::collection::vec(-1.0e6f32..1.0e6, 0..64)) {
            let len = values.len();
            let tensor = Tensor::from_vec(values.clone(), &[len]).unwrap();
            prop_assert_eq!(tensor.to_vec::<f32>().unwrap(), values);
        }
    }
}
