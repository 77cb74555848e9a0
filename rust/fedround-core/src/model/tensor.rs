//! Tensors and their element types.
//!
//! See the [model module] documentation since this is a private module anyways.
//!
//! [model module]: crate::model

use std::convert::TryFrom;

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The maximum number of dimensions of a tensor.
pub const MAX_RANK: usize = u8::MAX as usize;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
/// The primitive data type of the elements of a tensor.
pub enum DataType {
    /// 32 bit floating point numbers.
    F32 = 0,
    /// 64 bit floating point numbers.
    F64 = 1,
}

impl DataType {
    /// Gets the number of bytes of a single element of this data type.
    pub fn bytes_per_element(self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid data type tag {0}")]
/// An unknown data type tag.
pub struct InvalidDataType(pub u8);

impl TryFrom<u8> for DataType {
    type Error = InvalidDataType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DataType::F32),
            1 => Ok(DataType::F64),
            _ => Err(InvalidDataType(value)),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors related to the construction of tensors.
pub enum ShapeError {
    #[error("shape {shape:?} describes {expected} elements but {actual} were given")]
    /// The number of elements doesn't match the shape.
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("rank {0} exceeds the maximum rank {}", MAX_RANK)]
    /// The tensor has too many dimensions.
    RankTooLarge(usize),

    #[error("tensor is too large to be encoded")]
    /// A dimension or the number of elements doesn't fit into 32 bits.
    TooLarge,
}

#[derive(Debug, Clone, From, Serialize, Deserialize)]
/// The flat, row-major elements of a tensor.
///
/// Equality is bitwise, so that `NaN` payloads and signed zeros are distinguished and a
/// decoded tensor compares equal to the tensor it was encoded from.
pub enum TensorData {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TensorData {
    /// Gets the data type of the elements.
    pub fn data_type(&self) -> DataType {
        match self {
            TensorData::F32(_) => DataType::F32,
            TensorData::F64(_) => DataType::F64,
        }
    }

    /// Gets the number of elements.
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(data) => data.len(),
            TensorData::F64(data) => data.len(),
        }
    }

    /// Checks whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for TensorData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TensorData::F32(a), TensorData::F32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (TensorData::F64(a), TensorData::F64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorParts", into = "TensorParts")]
/// A tensor: a shape and the flat buffer of its elements.
///
/// The number of elements always equals the product of the dimensions. A tensor of rank `0` is
/// a scalar and holds exactly one element.
pub struct Tensor {
    shape: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Creates a tensor.
    ///
    /// # Errors
    /// Fails if the number of elements doesn't match the shape, or if the shape can't be encoded
    /// (more than [`MAX_RANK`] dimensions, or a dimension or element count above `u32::MAX`).
    pub fn new(shape: Vec<usize>, data: impl Into<TensorData>) -> Result<Self, ShapeError> {
        let data = data.into();
        if shape.len() > MAX_RANK {
            return Err(ShapeError::RankTooLarge(shape.len()));
        }
        if shape.iter().any(|dim| *dim > u32::MAX as usize) {
            return Err(ShapeError::TooLarge);
        }
        let expected = element_count(&shape).ok_or(ShapeError::TooLarge)?;
        if expected > u32::MAX as usize {
            return Err(ShapeError::TooLarge);
        }
        if expected != data.len() {
            return Err(ShapeError::LengthMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Creates a tensor of `f32` elements.
    ///
    /// # Errors
    /// See [`Tensor::new()`].
    pub fn from_f32(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, ShapeError> {
        Self::new(shape, data)
    }

    /// Creates a tensor of `f64` elements.
    ///
    /// # Errors
    /// See [`Tensor::new()`].
    pub fn from_f64(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, ShapeError> {
        Self::new(shape, data)
    }

    /// Gets the shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Gets the data type of the elements.
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Gets the elements.
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Gets the number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks whether the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gets the `f32` elements, if this is an `f32` tensor.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            TensorData::F32(data) => Some(data),
            TensorData::F64(_) => None,
        }
    }

    /// Gets the `f64` elements, if this is an `f64` tensor.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            TensorData::F64(data) => Some(data),
            TensorData::F32(_) => None,
        }
    }

    /// Gets the mutable `f32` elements, if this is an `f32` tensor.
    ///
    /// The shape can't change through the returned slice.
    pub fn as_f32_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.data {
            TensorData::F32(data) => Some(data),
            TensorData::F64(_) => None,
        }
    }

    /// Gets the mutable `f64` elements, if this is an `f64` tensor.
    ///
    /// The shape can't change through the returned slice.
    pub fn as_f64_mut(&mut self) -> Option<&mut [f64]> {
        match &mut self.data {
            TensorData::F64(data) => Some(data),
            TensorData::F32(_) => None,
        }
    }

    /// Adds `delta` to every element.
    pub fn add_scalar(&mut self, delta: f64) {
        match &mut self.data {
            TensorData::F32(data) => data.iter_mut().for_each(|x| *x += delta as f32),
            TensorData::F64(data) => data.iter_mut().for_each(|x| *x += delta),
        }
    }
}

/// Computes the number of elements described by a shape, `None` on overflow.
pub(crate) fn element_count(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1_usize, |count, dim| count.checked_mul(*dim))
}

#[derive(Serialize, Deserialize)]
struct TensorParts {
    shape: Vec<usize>,
    data: TensorData,
}

impl TryFrom<TensorParts> for Tensor {
    type Error = ShapeError;

    fn try_from(parts: TensorParts) -> Result<Self, Self::Error> {
        Tensor::new(parts.shape, parts.data)
    }
}

impl From<Tensor> for TensorParts {
    fn from(tensor: Tensor) -> Self {
        TensorParts {
            shape: tensor.shape,
            data: tensor.data,
        }
    }
}
