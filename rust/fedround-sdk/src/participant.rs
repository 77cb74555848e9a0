use derive_more::Display;
use fedround_core::{
    crypto::{ByteObject, PublicSigningKey, SigningKeyPair},
    message::{AuthenticationError, DecodeError, SignedMessage},
    model::{BinaryCodec, ParameterCodec, ParameterSet},
    CoordinatorPublicKey,
    InitError,
    ParticipantId,
    ParticipantPublicKey,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::traits::{TrainError, Trainer};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// The phase of a participant within a round.
///
/// The phases are ordered: a participant only moves forward within a round and falls back to
/// [`Phase::HasGlobalModel`] whenever it receives a new global model.
pub enum Phase {
    /// No global model was received yet.
    Idle,
    /// A verified global model is held and waits for training.
    HasGlobalModel,
    /// The local model is trained and an update can be composed from it.
    ///
    /// Encoding and signing the update don't change the phase, so a trained participant can
    /// compose its update as often as needed.
    Trained,
}

#[derive(Debug, Error)]
/// Errors of a participant.
pub enum ParticipantError {
    #[error("global model rejected: {0}")]
    /// The global model isn't signed by the coordinator.
    Authentication(#[from] AuthenticationError),
    #[error("global model can't be decoded: {0:#}")]
    /// The signed global model is malformed.
    Decode(DecodeError),
    #[error("{operation} is not possible in phase {actual}")]
    /// The operation isn't allowed in the current phase.
    InvalidState {
        operation: &'static str,
        actual: Phase,
    },
    #[error("local training failed: {0:#}")]
    /// The trainer failed.
    Training(TrainError),
}

/// A participant of federated learning rounds.
///
/// It owns its identity, its signing key pair and its local copy of the model. The local model
/// only changes on a verified global model or on a successful training run.
pub struct Participant<C = BinaryCodec> {
    id: ParticipantId,
    keys: SigningKeyPair,
    codec: C,
    phase: Phase,
    model: Option<ParameterSet>,
}

impl Participant<BinaryCodec> {
    /// Creates a participant with a freshly generated key pair.
    ///
    /// # Errors
    /// Fails if the crypto layer can't be initialized.
    pub fn new(id: impl Into<ParticipantId>) -> Result<Self, InitError> {
        fedround_core::init()?;
        Ok(Self::with_keys(id, SigningKeyPair::generate()))
    }

    /// Creates a participant with the given key pair.
    pub fn with_keys(id: impl Into<ParticipantId>, keys: SigningKeyPair) -> Self {
        Self::with_codec(id, keys, BinaryCodec)
    }
}

impl<C> Participant<C>
where
    C: ParameterCodec,
{
    /// Creates a participant that exchanges models with the given codec.
    ///
    /// The codec must be the one the coordinator uses.
    pub fn with_codec(id: impl Into<ParticipantId>, keys: SigningKeyPair, codec: C) -> Self {
        Self {
            id: id.into(),
            keys,
            codec,
            phase: Phase::Idle,
            model: None,
        }
    }

    /// Gets the identity.
    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    /// Gets the public key the coordinator verifies the updates with.
    pub fn public_key(&self) -> ParticipantPublicKey {
        self.keys.public
    }

    /// Gets the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Gets the local model, if any.
    pub fn model(&self) -> Option<&ParameterSet> {
        self.model.as_ref()
    }

    /// Accepts a global model signed by the coordinator.
    ///
    /// On success the decoded model replaces any prior local model and the participant moves to
    /// [`Phase::HasGlobalModel`], whatever phase it was in before.
    ///
    /// # Errors
    /// Fails if the signature doesn't verify under `coordinator_pk` or if the payload can't be
    /// decoded. The participant is left untouched in both cases.
    pub fn receive_global_model(
        &mut self,
        payload: &[u8],
        signature: &[u8],
        coordinator_pk: &CoordinatorPublicKey,
    ) -> Result<(), ParticipantError> {
        if !coordinator_pk.verify_raw(signature, payload) {
            warn!(participant = %self.id, "rejecting global model: invalid signature");
            return Err(AuthenticationError.into());
        }
        let model = self.codec.decode(payload).map_err(|error| {
            warn!(participant = %self.id, "rejecting global model: {:#}", error);
            ParticipantError::Decode(error)
        })?;
        debug!(
            participant = %self.id,
            tensors = model.len(),
            elements = model.element_count(),
            "received global model",
        );
        self.model = Some(model);
        self.phase = Phase::HasGlobalModel;
        Ok(())
    }

    /// Accepts a global model from a signed message of the coordinator.
    ///
    /// See [`receive_global_model()`](Self::receive_global_model).
    ///
    /// # Errors
    /// Same as [`receive_global_model()`](Self::receive_global_model).
    pub fn receive_signed_model(
        &mut self,
        message: &SignedMessage,
        coordinator_pk: &CoordinatorPublicKey,
    ) -> Result<(), ParticipantError> {
        self.receive_global_model(
            &message.payload,
            message.signature.as_slice(),
            coordinator_pk,
        )
    }

    /// Trains the local model for `epochs` passes over the local batches.
    ///
    /// The trainer works on a copy of the local model which only replaces it once every batch
    /// of every epoch went through. Zero epochs or no batches leave the parameters as they are
    /// but still count as a finished training.
    ///
    /// This blocks for as long as the training runs.
    ///
    /// # Errors
    /// Fails if no global model was received yet or if the trainer fails. The participant is
    /// left untouched in both cases.
    pub fn train_local_model<T>(
        &mut self,
        trainer: &mut T,
        local_data: &[T::Batch],
        epochs: usize,
    ) -> Result<(), ParticipantError>
    where
        T: Trainer,
    {
        let mut params = match (&self.model, self.phase) {
            (Some(model), Phase::HasGlobalModel) | (Some(model), Phase::Trained) => model.clone(),
            _ => return Err(self.invalid_state("training")),
        };

        for epoch in 0..epochs {
            for batch in local_data {
                trainer
                    .train_on_batch(&mut params, batch)
                    .map_err(|error| {
                        warn!(participant = %self.id, epoch, "training failed: {:#}", error);
                        ParticipantError::Training(error)
                    })?;
            }
            debug!(participant = %self.id, epoch, "finished epoch");
        }

        info!(
            participant = %self.id,
            epochs,
            batches = local_data.len(),
            "trained local model",
        );
        self.model = Some(params);
        self.phase = Phase::Trained;
        Ok(())
    }

    /// Encodes the trained local model as the payload of an update.
    ///
    /// # Errors
    /// Fails if the local model isn't trained.
    pub fn compute_update(&self) -> Result<Vec<u8>, ParticipantError> {
        match (&self.model, self.phase) {
            (Some(model), Phase::Trained) => Ok(self.codec.encode(model)),
            _ => Err(self.invalid_state("computing an update")),
        }
    }

    /// Signs an update payload with the secret key of the participant.
    pub fn send_update(&self, payload: Vec<u8>) -> SignedMessage {
        SignedMessage::sign(self.id.clone(), payload, &self.keys.secret)
    }

    /// Encodes and signs the trained local model.
    ///
    /// # Errors
    /// Fails if the local model isn't trained.
    pub fn compose_update(&self) -> Result<SignedMessage, ParticipantError> {
        let payload = self.compute_update()?;
        let message = self.send_update(payload);
        debug!(
            participant = %self.id,
            digest = %message.digest(),
            "composed update",
        );
        Ok(message)
    }

    /// Checks whether the given key is the public key of this participant.
    pub fn owns_key(&self, pk: &PublicSigningKey) -> bool {
        &self.keys.public == pk
    }

    fn invalid_state(&self, operation: &'static str) -> ParticipantError {
        warn!(participant = %self.id, phase = %self.phase, "{} rejected", operation);
        ParticipantError::InvalidState {
            operation,
            actual: self.phase,
        }
    }
}
