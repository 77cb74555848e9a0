//! Serialization of tensors and parameter sets.
//!
//! See the [model module] documentation since this is a private module anyways.
//!
//! [model module]: crate::model

use std::{
    convert::{TryFrom, TryInto},
    ops::Range,
};

use anyhow::{anyhow, Context};

use crate::{
    message::{utils::range, DecodeError, FromBytes, ToBytes},
    model::{
        parameter_set::ParameterSet,
        tensor::{element_count, DataType, Tensor, TensorData},
    },
};

const DATA_TYPE_FIELD: usize = 0;
const RANK_FIELD: usize = 1;
const RESERVED_FIELD: Range<usize> = range(2, 2);
const NUMBERS_FIELD: Range<usize> = range(RESERVED_FIELD.end, 4);
const DIMS_OFFSET: usize = NUMBERS_FIELD.end;
const DIM_LENGTH: usize = 4;

const COUNT_FIELD: Range<usize> = range(0, 4);

/// A buffer for a serialized [`Tensor`].
///
/// ```no_rust
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   data type   |      rank     |           reserved            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       number of elements                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   dimensions (rank * 4 bytes)                 |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |       elements (number of elements * bytes per element)       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// All integers and elements are big endian.
pub struct TensorBuffer<T> {
    inner: T,
}

#[allow(clippy::len_without_is_empty)]
impl<T: AsRef<[u8]>> TensorBuffer<T> {
    /// Creates a new buffer from `bytes`.
    ///
    /// # Errors
    /// Fails if the `bytes` don't hold a complete, consistent tensor.
    pub fn new(bytes: T) -> Result<Self, DecodeError> {
        let buffer = Self { inner: bytes };
        buffer
            .check_buffer_length()
            .context("not a valid tensor")?;
        Ok(buffer)
    }

    /// Creates a new buffer from `bytes` without any checks.
    pub fn new_unchecked(bytes: T) -> Self {
        Self { inner: bytes }
    }

    /// Checks that the header fields are valid and consistent with each other, and that the
    /// buffer holds all the elements they announce.
    pub fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.inner.as_ref().len();
        if len < DIMS_OFFSET {
            return Err(anyhow!("invalid buffer length: {} < {}", len, DIMS_OFFSET));
        }
        DataType::try_from(self.data_type())?;
        if self.reserved().iter().any(|byte| *byte != 0) {
            return Err(anyhow!("invalid reserved field: {:?}", self.reserved()));
        }
        if len < self.dims_end() {
            return Err(anyhow!(
                "invalid buffer length: {} < {} for a tensor of rank {}",
                len,
                self.dims_end(),
                self.rank()
            ));
        }

        let shape = self.shape();
        let numbers = self.numbers();
        match element_count(&shape) {
            Some(count) if count == numbers => {}
            _ => {
                return Err(anyhow!(
                    "shape {:?} doesn't describe {} elements",
                    shape,
                    numbers
                ))
            }
        }

        let total_expected_length = self.try_len()?;
        if len < total_expected_length {
            return Err(anyhow!(
                "invalid buffer length: expected {} bytes but buffer has only {} bytes",
                total_expected_length,
                len
            ));
        }
        Ok(())
    }

    /// Gets the expected length of the buffer, similar to [`len()`] but without panicking.
    ///
    /// [`len()`]: TensorBuffer::len
    fn try_len(&self) -> Result<usize, DecodeError> {
        let data_type = DataType::try_from(self.data_type())?;
        self.numbers()
            .checked_mul(data_type.bytes_per_element())
            .and_then(|data_length| data_length.checked_add(self.dims_end()))
            .ok_or_else(|| anyhow!("invalid tensor buffer: element count overflows"))
    }

    /// Gets the expected number of bytes of this buffer.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn len(&self) -> usize {
        // unwrap safe: the data type is checked together with the buffer
        self.try_len().unwrap()
    }

    /// Gets the data type tag.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn data_type(&self) -> u8 {
        self.inner.as_ref()[DATA_TYPE_FIELD]
    }

    /// Gets the number of dimensions.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn rank(&self) -> usize {
        self.inner.as_ref()[RANK_FIELD] as usize
    }

    fn reserved(&self) -> &[u8] {
        &self.inner.as_ref()[RESERVED_FIELD]
    }

    /// Gets the number of elements.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn numbers(&self) -> usize {
        // unwrap safe: the slice is exactly 4 bytes long
        u32::from_be_bytes(self.inner.as_ref()[NUMBERS_FIELD].try_into().unwrap()) as usize
    }

    fn dims_end(&self) -> usize {
        DIMS_OFFSET + self.rank() * DIM_LENGTH
    }

    /// Gets the dimensions.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn shape(&self) -> Vec<usize> {
        self.inner.as_ref()[DIMS_OFFSET..self.dims_end()]
            .chunks_exact(DIM_LENGTH)
            // unwrap safe: the chunks are exactly 4 bytes long
            .map(|dim| u32::from_be_bytes(dim.try_into().unwrap()) as usize)
            .collect()
    }

    /// Gets the serialized elements.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn data(&self) -> &[u8] {
        &self.inner.as_ref()[self.dims_end()..self.len()]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> TensorBuffer<T> {
    /// Sets the data type tag.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn set_data_type(&mut self, data_type: DataType) {
        self.inner.as_mut()[DATA_TYPE_FIELD] = data_type as u8;
    }

    /// Sets the dimensions, the rank and clears the reserved field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn set_shape(&mut self, shape: &[usize]) {
        let bytes = self.inner.as_mut();
        bytes[RANK_FIELD] = shape.len() as u8;
        bytes[RESERVED_FIELD].copy_from_slice(&[0, 0]);
        let dims = &mut bytes[DIMS_OFFSET..DIMS_OFFSET + shape.len() * DIM_LENGTH];
        for (dim, chunk) in shape.iter().zip(dims.chunks_exact_mut(DIM_LENGTH)) {
            chunk.copy_from_slice(&(*dim as u32).to_be_bytes());
        }
    }

    /// Sets the number of elements.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn set_numbers(&mut self, value: u32) {
        self.inner.as_mut()[NUMBERS_FIELD].copy_from_slice(&value.to_be_bytes());
    }

    /// Gets the serialized elements.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn data_mut(&mut self) -> &mut [u8] {
        let start = self.dims_end();
        let end = self.len();
        &mut self.inner.as_mut()[start..end]
    }
}

impl ToBytes for Tensor {
    fn buffer_length(&self) -> usize {
        DIMS_OFFSET
            + self.shape().len() * DIM_LENGTH
            + self.len() * self.data_type().bytes_per_element()
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let mut writer = TensorBuffer::new_unchecked(buffer.as_mut());
        writer.set_data_type(self.data_type());
        writer.set_shape(self.shape());
        // the element count fits into 32 bits, see `Tensor::new()`
        writer.set_numbers(self.len() as u32);

        let data = writer.data_mut();
        match self.data() {
            TensorData::F32(elements) => {
                for (element, chunk) in elements.iter().zip(data.chunks_exact_mut(4)) {
                    chunk.copy_from_slice(&element.to_be_bytes());
                }
            }
            TensorData::F64(elements) => {
                for (element, chunk) in elements.iter().zip(data.chunks_exact_mut(8)) {
                    chunk.copy_from_slice(&element.to_be_bytes());
                }
            }
        }
    }
}

impl FromBytes for Tensor {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let reader = TensorBuffer::new(buffer.as_ref())?;
        if reader.len() != buffer.as_ref().len() {
            return Err(anyhow!(
                "invalid tensor: {} trailing bytes",
                buffer.as_ref().len() - reader.len()
            ));
        }
        let data = match DataType::try_from(reader.data_type())? {
            DataType::F32 => TensorData::F32(
                reader
                    .data()
                    .chunks_exact(4)
                    // unwrap safe: the chunks are exactly 4 bytes long
                    .map(|chunk| f32::from_be_bytes(chunk.try_into().unwrap()))
                    .collect(),
            ),
            DataType::F64 => TensorData::F64(
                reader
                    .data()
                    .chunks_exact(8)
                    // unwrap safe: the chunks are exactly 8 bytes long
                    .map(|chunk| f64::from_be_bytes(chunk.try_into().unwrap()))
                    .collect(),
            ),
        };
        Ok(Tensor::new(reader.shape(), data)?)
    }
}

/// The serialization of a [`ParameterSet`] is a 4 bytes big endian tensor count, followed by
/// the tensors in order.
impl ToBytes for ParameterSet {
    fn buffer_length(&self) -> usize {
        COUNT_FIELD.end + self.iter().map(ToBytes::buffer_length).sum::<usize>()
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let buffer = buffer.as_mut();
        buffer[COUNT_FIELD].copy_from_slice(&(self.len() as u32).to_be_bytes());
        let mut offset = COUNT_FIELD.end;
        for tensor in self.iter() {
            let end = offset + tensor.buffer_length();
            tensor.to_bytes(&mut &mut buffer[offset..end]);
            offset = end;
        }
    }
}

impl FromBytes for ParameterSet {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let bytes = buffer.as_ref();
        if bytes.len() < COUNT_FIELD.end {
            return Err(anyhow!(
                "invalid parameter set: buffer length {} < {}",
                bytes.len(),
                COUNT_FIELD.end
            ));
        }
        // unwrap safe: the slice is exactly 4 bytes long
        let count = u32::from_be_bytes(bytes[COUNT_FIELD].try_into().unwrap()) as usize;

        // every tensor needs at least a header, which bounds the preallocation
        let mut tensors = Vec::with_capacity(count.min(bytes.len() / DIMS_OFFSET));
        let mut offset = COUNT_FIELD.end;
        for index in 0..count {
            let reader = TensorBuffer::new(&bytes[offset..])
                .with_context(|| format!("invalid tensor at position {}", index))?;
            let end = offset + reader.len();
            let tensor = Tensor::from_bytes(&&bytes[offset..end])
                .with_context(|| format!("invalid tensor at position {}", index))?;
            tensors.push(tensor);
            offset = end;
        }

        if offset != bytes.len() {
            return Err(anyhow!(
                "invalid parameter set: {} trailing bytes",
                bytes.len() - offset
            ));
        }
        Ok(ParameterSet::new(tensors))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn tensor() -> (Tensor, Vec<u8>) {
        let tensor = Tensor::from_f32(vec![2, 1], vec![1.0, -2.0]).unwrap();
        let mut bytes = vec![
            0x00, // data type: f32
            0x02, // rank
            0x00, 0x00, // reserved
            0x00, 0x00, 0x00, 0x02, // number of elements
            0x00, 0x00, 0x00, 0x02, // dim 0
            0x00, 0x00, 0x00, 0x01, // dim 1
        ];
        bytes.extend(&1.0_f32.to_be_bytes());
        bytes.extend(&(-2.0_f32).to_be_bytes());
        (tensor, bytes)
    }

    pub fn parameter_set() -> (ParameterSet, Vec<u8>) {
        let (first, first_bytes) = tensor();
        let second = Tensor::from_f64(vec![], vec![0.1]).unwrap();
        let mut bytes = vec![0x00, 0x00, 0x00, 0x02]; // tensor count
        bytes.extend(first_bytes);
        bytes.extend(vec![
            0x01, // data type: f64
            0x00, // rank
            0x00, 0x00, // reserved
            0x00, 0x00, 0x00, 0x01, // number of elements
        ]);
        bytes.extend(&0.1_f64.to_be_bytes());
        (ParameterSet::new(vec![first, second]), bytes)
    }

    #[test]
    fn serialize_tensor() {
        let (tensor, expected) = tensor();
        assert_eq!(tensor.buffer_length(), expected.len());
        assert_eq!(tensor.to_vec(), expected);
    }

    #[test]
    fn deserialize_tensor() {
        let (expected, bytes) = tensor();
        assert_eq!(Tensor::from_bytes(&bytes).unwrap(), expected);
    }

    #[test]
    fn serialize_parameter_set() {
        let (params, expected) = parameter_set();
        assert_eq!(params.to_vec(), expected);
    }

    #[test]
    fn deserialize_parameter_set() {
        let (expected, bytes) = parameter_set();
        assert_eq!(ParameterSet::from_bytes(&bytes).unwrap(), expected);
    }

    #[test]
    fn deserialize_empty_parameter_set() {
        let bytes = vec![0x00, 0x00, 0x00, 0x00];
        assert!(ParameterSet::from_bytes(&bytes).unwrap().is_empty());
    }

    #[test]
    fn deserialize_truncated_parameter_set() {
        let (_, bytes) = parameter_set();
        for end in 0..bytes.len() {
            assert!(ParameterSet::from_bytes(&&bytes[..end]).is_err());
        }
    }

    #[test]
    fn deserialize_trailing_bytes() {
        let (_, mut bytes) = parameter_set();
        bytes.push(0x00);
        assert!(ParameterSet::from_bytes(&bytes).is_err());

        let (_, mut bytes) = tensor();
        bytes.push(0x00);
        assert!(Tensor::from_bytes(&bytes).is_err());
    }

    #[test]
    fn deserialize_shape_inconsistent_with_elements() {
        let (_, mut bytes) = tensor();
        // declare 3 elements for a 2x1 shape
        bytes[NUMBERS_FIELD].copy_from_slice(&3_u32.to_be_bytes());
        bytes.extend(&0_f32.to_be_bytes());
        assert!(Tensor::from_bytes(&bytes).is_err());
    }

    #[test]
    fn deserialize_invalid_header_fields() {
        let (_, bytes) = tensor();

        let mut invalid_type = bytes.clone();
        invalid_type[DATA_TYPE_FIELD] = 0x07;
        assert!(Tensor::from_bytes(&invalid_type).is_err());

        let mut invalid_reserved = bytes.clone();
        invalid_reserved[RESERVED_FIELD.start] = 0x01;
        assert!(Tensor::from_bytes(&invalid_reserved).is_err());

        let mut huge_count = bytes;
        huge_count[NUMBERS_FIELD].copy_from_slice(&u32::MAX.to_be_bytes());
        assert!(Tensor::from_bytes(&huge_count).is_err());
    }

    #[test]
    fn deserialize_huge_tensor_count() {
        let bytes = vec![0xff, 0xff, 0xff, 0xff];
        assert!(ParameterSet::from_bytes(&bytes).is_err());
    }
}
