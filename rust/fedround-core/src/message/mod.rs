//! The messages exchanged during a round.
//!
//! # The signed message
//! A [`SignedMessage`] binds a payload to a signature and the identity of its sender. It is used
//! in both directions of a round:
//! - The coordinator signs the encoded global model before distributing it to the participants.
//! - A participant signs its encoded local update before returning it to the coordinator.
//!
//! The payload of a signed message must not be trusted, and in particular must not be decoded
//! into a [`ParameterSet`], before [`SignedMessage::open()`] or [`SignedMessage::verify()`]
//! succeeded with the public key of the claimed sender. Public keys are exchanged out-of-band.
//!
//! # Wire format
//! Signed messages implement [`ToBytes`] and [`FromBytes`]. See [`SignedMessageBuffer`] for the
//! layout.
//!
//! [`ParameterSet`]: crate::model::ParameterSet

pub(crate) mod signed;
pub(crate) mod traits;
pub(crate) mod utils;

pub use self::{
    signed::{AuthenticationError, SignedMessage, SignedMessageBuffer, HEADER_LENGTH},
    traits::{FromBytes, ToBytes},
};

/// An error that signals a failure when trying to parse a message or a model.
///
/// This is kept generic on purpose to not reveal to the sender what specifically failed during
/// parsing.
pub type DecodeError = anyhow::Error;
