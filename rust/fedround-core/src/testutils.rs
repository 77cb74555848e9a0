//! Fixtures shared by the tests of the fedround crates.

use crate::{
    crypto::{ByteObject, SigningKeyPair, SigningKeySeed},
    model::{ParameterSet, Tensor},
};

/// Derives a deterministic key pair from a one byte seed.
pub fn signing_keys(seed: u8) -> SigningKeyPair {
    SigningKeyPair::derive_from_seed(&SigningKeySeed::fill_with(seed))
}

/// Creates a parameter set with a single `f32` tensor.
pub fn single_tensor(shape: Vec<usize>, data: Vec<f32>) -> ParameterSet {
    ParameterSet::new(vec![Tensor::from_f32(shape, data).unwrap()])
}

/// Creates a small two-layer parameter set, a `2x2` weight matrix and a bias vector of length
/// `2`, with every element set to `value`.
pub fn dense_layer(value: f32) -> ParameterSet {
    ParameterSet::new(vec![
        Tensor::from_f32(vec![2, 2], vec![value; 4]).unwrap(),
        Tensor::from_f32(vec![2], vec![value; 2]).unwrap(),
    ])
}
