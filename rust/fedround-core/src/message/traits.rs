//! Byte conversion traits.
//!
//! See the [message module] documentation since this is a private module anyways.
//!
//! [message module]: crate::message

use anyhow::anyhow;

use crate::{crypto::ByteObject, message::DecodeError};

/// A type with a binary wire representation of a known length.
///
/// See also [`FromBytes`] for the inverse conversion.
pub trait ToBytes {
    /// The exact number of bytes [`to_bytes()`] writes.
    ///
    /// [`to_bytes()`]: ToBytes::to_bytes
    fn buffer_length(&self) -> usize;

    /// Writes the wire representation into the front of `buffer`.
    ///
    /// # Panics
    /// Panics if `buffer` is shorter than [`buffer_length()`].
    ///
    /// [`buffer_length()`]: ToBytes::buffer_length
    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T);

    /// Writes the wire representation into a new vector.
    fn to_vec(&self) -> Vec<u8> {
        let mut buffer = vec![0; self.buffer_length()];
        self.to_bytes(&mut buffer);
        buffer
    }
}

/// A type that can be read back from its binary wire representation.
///
/// See also [`ToBytes`].
pub trait FromBytes: Sized {
    /// Reads a value from `buffer`, which must hold exactly one wire representation.
    ///
    /// # Errors
    /// Fails on truncated, oversized or malformed buffers.
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError>;
}

impl<T> FromBytes for T
where
    T: ByteObject,
{
    fn from_bytes<U: AsRef<[u8]>>(buffer: &U) -> Result<Self, DecodeError> {
        let bytes = buffer.as_ref();
        Self::from_slice(bytes)
            .ok_or_else(|| anyhow!("expected {} bytes, got {}", Self::LENGTH, bytes.len()))
    }
}

impl<T> ToBytes for T
where
    T: ByteObject,
{
    fn buffer_length(&self) -> usize {
        Self::LENGTH
    }

    fn to_bytes<U: AsMut<[u8]>>(&self, buffer: &mut U) {
        buffer.as_mut()[..Self::LENGTH].copy_from_slice(self.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Signature;

    #[test]
    fn test_byte_object_to_vec() {
        let signature = Signature::fill_with(0x2a);
        assert_eq!(signature.to_vec(), vec![0x2a; Signature::LENGTH]);
        assert_eq!(Signature::from_bytes(&signature.to_vec()).unwrap(), signature);
    }

    #[test]
    fn test_byte_object_wrong_length() {
        assert!(Signature::from_bytes(&vec![0; Signature::LENGTH - 1]).is_err());
        assert!(Signature::from_bytes(&vec![0; Signature::LENGTH + 1]).is_err());
    }
}
