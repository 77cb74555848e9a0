#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Fedround: signed model exchange for federated learning rounds
//!
//! A federated learning round moves models in two directions. The coordinator distributes a
//! signed global model to the participants, every participant trains that model on its local
//! data and returns a signed update, and the coordinator verifies and averages the updates into
//! the next global model.
//!
//! This crate holds the pieces that both sides of a round share:
//!
//! - [`crypto`]: `Ed25519` key pairs, detached signatures and `SHA256` digests.
//! - [`model`]: the [`ParameterSet`] representation of a model, its byte codecs and the exact
//!   parameter-wise mean [`Aggregation`].
//! - [`message`]: the [`SignedMessage`] envelope that binds a payload to a signature and the
//!   identity of its sender.
//!
//! The participant role lives in `fedround-sdk` and the coordinator role in `fedround-server`.
//!
//! [`ParameterSet`]: crate::model::ParameterSet
//! [`Aggregation`]: crate::model::Aggregation
//! [`SignedMessage`]: crate::message::SignedMessage

pub mod crypto;
pub mod message;
pub mod model;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

use std::fmt;

use derive_more::{AsRef, Display, From, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::crypto::sign::{PublicSigningKey, SecretSigningKey};

#[derive(Error, Debug)]
#[error("initialization failed: insufficient system entropy to generate secrets")]
/// An error related to insufficient system entropy for secrets at program startup.
pub struct InitError;

/// Initializes the crypto layer.
///
/// Must be called before any key material is generated. Calling it more than once is harmless.
///
/// # Errors
/// Fails if there is insufficient system entropy to generate secrets.
pub fn init() -> Result<(), InitError> {
    sodiumoxide::init().or(Err(InitError))
}

/// A public signature key that identifies the coordinator of a round.
pub type CoordinatorPublicKey = PublicSigningKey;

/// A secret signature key that belongs to the public key of the coordinator.
pub type CoordinatorSecretKey = SecretSigningKey;

/// A public signature key that belongs to a participant.
pub type ParticipantPublicKey = PublicSigningKey;

/// A secret signature key that belongs to the public key of a participant.
pub type ParticipantSecretKey = SecretSigningKey;

#[derive(
    AsRef, Display, From, Into, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
/// An opaque identifier of a participant.
///
/// It is unique per participant for the lifetime of a round and keys the updates the
/// coordinator buffers.
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a participant identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Gets the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ParticipantId({:?})", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
