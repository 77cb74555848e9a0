//! Codecs that turn parameter sets into payloads and back.
//!
//! See the [model module] documentation since this is a private module anyways.
//!
//! [model module]: crate::model

use std::fmt::Debug;

use anyhow::Context;
use bincode::Options;

use crate::{
    message::{DecodeError, FromBytes, ToBytes},
    model::ParameterSet,
};

/// A deterministic conversion between parameter sets and byte payloads.
///
/// Implementations must satisfy `decode(encode(p)) == p` for every parameter set `p`.
pub trait ParameterCodec: Debug + Send + Sync {
    /// Encodes the parameter set.
    fn encode(&self, params: &ParameterSet) -> Vec<u8>;

    /// Decodes a parameter set.
    ///
    /// # Errors
    /// Fails on truncated, malformed or structurally inconsistent payloads.
    fn decode(&self, bytes: &[u8]) -> Result<ParameterSet, DecodeError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// The compact binary encoding of the [`ToBytes`] and [`FromBytes`] implementations.
pub struct BinaryCodec;

impl ParameterCodec for BinaryCodec {
    fn encode(&self, params: &ParameterSet) -> Vec<u8> {
        params.to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<ParameterSet, DecodeError> {
        ParameterSet::from_bytes(&bytes)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// A [bincode] encoding of the serde representation of parameter sets.
///
/// Integers have a fixed width and a payload with trailing bytes is rejected.
///
/// [bincode]: https://docs.rs/bincode/
pub struct BincodeCodec;

impl BincodeCodec {
    fn options() -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .reject_trailing_bytes()
    }
}

impl ParameterCodec for BincodeCodec {
    fn encode(&self, params: &ParameterSet) -> Vec<u8> {
        // safe unwrap: there is no size limit and the tensor conversions are infallible
        Self::options().serialize(params).unwrap()
    }

    fn decode(&self, bytes: &[u8]) -> Result<ParameterSet, DecodeError> {
        Self::options()
            .deserialize(bytes)
            .context("invalid bincode parameter set")
    }
}
