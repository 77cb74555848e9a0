#![cfg_attr(docsrs, feature(doc_cfg))]
//! The coordinator side of a fedround federated learning round.
//!
//! A round has three steps on the coordinator:
//!
//! 1. [`SecureAggregator::publish_global_model()`] signs the global model that is distributed
//!    to the participants.
//! 2. [`SecureAggregator::receive_client_update()`] verifies the signed update of a
//!    participant against the public key the caller trusts for it and buffers the update in
//!    the [`RoundState`] of the current round.
//! 3. [`SecureAggregator::aggregate_updates()`] computes the element-wise mean of the buffered
//!    updates once at least the quorum of two distinct participants submitted one, and
//!    [`SecureAggregator::close_round()`] starts the next round.
//!
//! The [`services`] module runs an aggregator in a tokio task that serializes the requests of
//! concurrent participants, and the [`settings`] module loads the round and logging
//! configuration.
//!
//! ```
//! use fedround_core::{
//!     crypto::{ByteObject, SigningKeyPair},
//!     model::{BinaryCodec, ParameterCodec, ParameterSet, Tensor},
//! };
//! use fedround_server::SecureAggregator;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut aggregator = SecureAggregator::new()?;
//! for (id, value) in &[("alice", 1.0), ("bob", 3.0)] {
//!     let keys = SigningKeyPair::generate();
//!     let update = ParameterSet::new(vec![Tensor::from_f32(vec![2], vec![*value; 2])?]);
//!     let payload = BinaryCodec.encode(&update);
//!     let signature = keys.secret.sign_detached(&payload);
//!     aggregator.receive_client_update((*id).into(), &payload, signature.as_slice(), &keys.public)?;
//! }
//!
//! let global = BinaryCodec.decode(&aggregator.aggregate_updates()?)?;
//! assert_eq!(global[0].as_f32(), Some(&[2.0, 2.0][..]));
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod round;
pub mod services;
pub mod settings;

pub use self::{
    aggregator::{DuplicatePolicy, RoundError, SecureAggregator, COORDINATOR_ID},
    round::{RoundId, RoundState},
};
