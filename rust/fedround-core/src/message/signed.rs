//! Signed message envelopes.
//!
//! See the [message module] documentation since this is a private module anyways.
//!
//! [message module]: crate::message

use std::convert::TryInto;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    crypto::{ByteObject, PublicSigningKey, SecretSigningKey, Sha256, Signature},
    message::{utils::range, DecodeError, FromBytes, ToBytes},
    ParticipantId,
};

#[derive(Debug, Error, Eq, PartialEq, Clone, Copy)]
#[error("signature verification failed")]
/// The signature of a message doesn't match its payload under the expected public key.
pub struct AuthenticationError;

pub(crate) mod ranges {
    use std::ops::Range;

    use super::*;

    /// Byte range corresponding to the signature of the payload.
    pub const SIGNATURE: Range<usize> = range(0, Signature::LENGTH);
    /// Byte range corresponding to the length field.
    pub const LENGTH: Range<usize> = range(SIGNATURE.end, 4);
    /// Byte range corresponding to the sender length field.
    pub const SENDER_LENGTH: Range<usize> = range(LENGTH.end, 4);
}

/// Length in bytes of a message header.
pub const HEADER_LENGTH: usize = ranges::SENDER_LENGTH.end;

/// A wrapper around a buffer that contains a [`SignedMessage`].
///
/// ```no_rust
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                     signature (64 bytes)                      +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             length                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         sender length                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   sender (variable length)                    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   payload (variable length)                   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// - `signature` is the signature of the payload
/// - `length` is the length in bytes of the _full_ message, _i.e._ including the header
/// - `sender length` is the length in bytes of the `sender` field
/// - `sender` is the UTF-8 encoded [`ParticipantId`] of the sender
pub struct SignedMessageBuffer<T> {
    inner: T,
}

impl<T: AsRef<[u8]>> SignedMessageBuffer<T> {
    /// Performs bound checks on `bytes` and returns a new [`SignedMessageBuffer`].
    ///
    /// # Errors
    /// Fails if the `bytes` are smaller than a minimal-sized message buffer.
    pub fn new(bytes: T) -> Result<Self, DecodeError> {
        let buffer = Self { inner: bytes };
        buffer
            .check_buffer_length()
            .context("not a valid signed message")?;
        Ok(buffer)
    }

    /// Returns a [`SignedMessageBuffer`] without performing any bound checks.
    pub fn new_unchecked(bytes: T) -> Self {
        Self { inner: bytes }
    }

    /// Performs bound checks to ensure the fields can be accessed without panicking.
    pub fn check_buffer_length(&self) -> Result<(), DecodeError> {
        let len = self.inner.as_ref().len();
        if len < HEADER_LENGTH {
            return Err(anyhow!("invalid buffer length: {} < {}", len, HEADER_LENGTH));
        }

        let total_length = self.length() as usize;
        if total_length != len {
            return Err(anyhow!(
                "invalid buffer length: length field is {} but buffer has {} bytes",
                total_length,
                len
            ));
        }

        let sender_end = HEADER_LENGTH as u64 + u64::from(self.sender_length());
        if sender_end > len as u64 {
            return Err(anyhow!(
                "invalid sender field: it ends at {} but buffer has {} bytes",
                sender_end,
                len
            ));
        }
        Ok(())
    }

    /// Gets the signature field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn signature(&self) -> &[u8] {
        &self.inner.as_ref()[ranges::SIGNATURE]
    }

    /// Gets the length field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn length(&self) -> u32 {
        // unwrap safe: the slice is exactly 4 bytes long
        u32::from_be_bytes(self.inner.as_ref()[ranges::LENGTH].try_into().unwrap())
    }

    /// Gets the sender length field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn sender_length(&self) -> u32 {
        // unwrap safe: the slice is exactly 4 bytes long
        u32::from_be_bytes(self.inner.as_ref()[ranges::SENDER_LENGTH].try_into().unwrap())
    }

    fn sender_end(&self) -> usize {
        HEADER_LENGTH + self.sender_length() as usize
    }

    /// Gets the sender field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn sender(&self) -> &[u8] {
        &self.inner.as_ref()[HEADER_LENGTH..self.sender_end()]
    }

    /// Gets the payload field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn payload(&self) -> &[u8] {
        &self.inner.as_ref()[self.sender_end()..]
    }
}

impl<T: AsMut<[u8]>> SignedMessageBuffer<T> {
    /// Gets a mutable reference to the signature field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn signature_mut(&mut self) -> &mut [u8] {
        &mut self.inner.as_mut()[ranges::SIGNATURE]
    }

    /// Sets the length field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn set_length(&mut self, value: u32) {
        self.inner.as_mut()[ranges::LENGTH].copy_from_slice(&value.to_be_bytes());
    }

    /// Sets the sender length field.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn set_sender_length(&mut self, value: u32) {
        self.inner.as_mut()[ranges::SENDER_LENGTH].copy_from_slice(&value.to_be_bytes());
    }

    /// Gets a mutable reference to everything after the header.
    ///
    /// # Panics
    /// May panic if this buffer is unchecked.
    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.inner.as_mut()[HEADER_LENGTH..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A payload bound to a signature and the identity of its sender.
pub struct SignedMessage {
    /// The identity the sender claims.
    pub sender: ParticipantId,
    /// The payload, usually an encoded [`ParameterSet`].
    ///
    /// [`ParameterSet`]: crate::model::ParameterSet
    pub payload: Vec<u8>,
    /// The signature of the payload.
    pub signature: Signature,
}

impl SignedMessage {
    /// Signs the `payload` with the secret key of the `sender`.
    pub fn sign(sender: ParticipantId, payload: Vec<u8>, sk: &SecretSigningKey) -> Self {
        let signature = sk.sign_detached(&payload);
        Self {
            sender,
            payload,
            signature,
        }
    }

    /// Checks the signature against the payload and the public key of the claimed sender.
    pub fn verify(&self, pk: &PublicSigningKey) -> bool {
        pk.verify_detached(&self.signature, &self.payload)
    }

    /// Releases the payload if the signature is valid under the public key of the claimed
    /// sender.
    ///
    /// # Errors
    /// Fails if the signature doesn't verify. The payload is dropped in that case.
    pub fn open(self, pk: &PublicSigningKey) -> Result<Vec<u8>, AuthenticationError> {
        if self.verify(pk) {
            Ok(self.payload)
        } else {
            Err(AuthenticationError)
        }
    }

    /// Computes the digest of the payload.
    pub fn digest(&self) -> Sha256 {
        Sha256::hash(&self.payload)
    }
}

impl ToBytes for SignedMessage {
    fn buffer_length(&self) -> usize {
        HEADER_LENGTH + self.sender.as_str().len() + self.payload.len()
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let length = self.buffer_length();
        let mut writer = SignedMessageBuffer::new_unchecked(buffer.as_mut());
        self.signature.to_bytes(&mut writer.signature_mut());
        writer.set_length(length as u32);

        let sender = self.sender.as_str().as_bytes();
        writer.set_sender_length(sender.len() as u32);
        let body = writer.body_mut();
        body[..sender.len()].copy_from_slice(sender);
        body[sender.len()..sender.len() + self.payload.len()].copy_from_slice(&self.payload);
    }
}

impl FromBytes for SignedMessage {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let reader = SignedMessageBuffer::new(buffer.as_ref())?;
        let signature =
            Signature::from_bytes(&reader.signature()).context("invalid signature field")?;
        let sender = String::from_utf8(reader.sender().to_vec())
            .context("invalid sender field: not UTF-8")?;
        Ok(Self {
            sender: ParticipantId::new(sender),
            payload: reader.payload().to_vec(),
            signature,
        })
    }
}
