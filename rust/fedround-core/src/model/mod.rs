//! Model representation, serialization and aggregation.
//!
//! # Parameter sets
//! A [`ParameterSet`] is the trainable numeric state of a model, independent of any training
//! framework: an ordered sequence of [`Tensor`]s, each made of a shape and a flat buffer of
//! `f32` or `f64` elements.
//!
//! # Codecs
//! A [`ParameterCodec`] turns a parameter set into the payload of a signed message and back.
//! [`BinaryCodec`] is the compact default, see [`TensorBuffer`] for its layout, and
//! [`BincodeCodec`] encodes the serde representation with bincode. Decoding checks that every
//! declared shape matches the number of elements that follow it.
//!
//! ```
//! # use fedround_core::model::{BinaryCodec, ParameterCodec, ParameterSet, Tensor};
//! let params = ParameterSet::new(vec![
//!     Tensor::from_f32(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
//!     Tensor::from_f32(vec![2], vec![0.5, -0.5]).unwrap(),
//! ]);
//! let bytes = BinaryCodec.encode(&params);
//! assert_eq!(BinaryCodec.decode(&bytes).unwrap(), params);
//! ```
//!
//! # Aggregation
//! An [`Aggregation`] computes the element-wise mean of parameter sets of the same
//! architecture. Parameter sets with a different tensor count, data type or shape are rejected
//! instead of being averaged into a malformed result.
//!
//! ```
//! # use fedround_core::model::{mean, ParameterSet, Tensor, MIN_QUORUM};
//! let a = ParameterSet::new(vec![Tensor::from_f32(vec![2], vec![1.0, 2.0]).unwrap()]);
//! let b = ParameterSet::new(vec![Tensor::from_f32(vec![2], vec![3.0, 4.0]).unwrap()]);
//! let global = mean(vec![&a, &b], MIN_QUORUM).unwrap();
//! assert_eq!(global[0].as_f32().unwrap(), &[2.0, 3.0]);
//! ```

pub(crate) mod aggregation;
pub(crate) mod codec;
pub(crate) mod parameter_set;
pub(crate) mod serialization;
pub(crate) mod tensor;

pub use self::{
    aggregation::{mean, Aggregation, AggregationError, MIN_QUORUM},
    codec::{BinaryCodec, BincodeCodec, ParameterCodec},
    parameter_set::ParameterSet,
    serialization::TensorBuffer,
    tensor::{DataType, InvalidDataType, ShapeError, Tensor, TensorData, MAX_RANK},
};
