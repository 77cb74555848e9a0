//! The coordinator role of a round.

use std::mem;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use fedround_core::{
    crypto::{ByteObject, SigningKeyPair},
    message::{DecodeError, SignedMessage},
    model::{AggregationError, BinaryCodec, ParameterCodec, ParameterSet, MIN_QUORUM},
    CoordinatorPublicKey,
    InitError,
    ParticipantId,
    ParticipantPublicKey,
};

use crate::{
    round::{RoundId, RoundState},
    settings::RoundSettings,
};

/// The sender identity the coordinator puts on the global models it signs.
pub const COORDINATOR_ID: &str = "coordinator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
/// How a second update of the same participant within a round is handled.
///
/// Either way a participant contributes at most one update to the mean.
pub enum DuplicatePolicy {
    /// The latest update replaces the buffered one.
    Overwrite,
    /// The latest update is rejected and the buffered one is kept.
    Reject,
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        Self::Overwrite
    }
}

#[derive(Debug, Error)]
/// Errors of the coordinator. None of them changes the buffered updates.
pub enum RoundError {
    #[error("update of {0} rejected: invalid signature")]
    /// The signature doesn't verify under the public key of the claimed participant.
    Authentication(ParticipantId),

    #[error("update of {participant} can't be decoded: {error:#}")]
    /// The signed payload is malformed.
    Decode {
        participant: ParticipantId,
        error: DecodeError,
    },

    #[error("insufficient participants: need {needed}, got {actual}")]
    /// Fewer updates than the quorum are buffered.
    InsufficientParticipants { needed: usize, actual: usize },

    #[error("update doesn't match the model architecture: {0}")]
    /// The update has a different tensor count, data type or shape.
    ShapeMismatch(String),

    #[error("{0} already submitted an update in this round")]
    /// The participant already submitted an update and duplicates are rejected.
    DuplicateUpdate(ParticipantId),

    #[error("tensor {tensor} holds a non-finite value at index {index}")]
    /// A value is `NaN` or infinite.
    NonFiniteValue { tensor: usize, index: usize },

    #[error("the mean of tensor {tensor} at index {index} is not representable")]
    /// The mean overflows the data type of its tensor.
    Unrepresentable { tensor: usize, index: usize },
}

impl From<AggregationError> for RoundError {
    fn from(error: AggregationError) -> Self {
        match error {
            AggregationError::InsufficientParticipants { needed, actual } => {
                Self::InsufficientParticipants { needed, actual }
            }
            AggregationError::ShapeMismatch(reason) => Self::ShapeMismatch(reason),
            AggregationError::NonFiniteValue { tensor, index } => {
                Self::NonFiniteValue { tensor, index }
            }
            AggregationError::Unrepresentable { tensor, index } => {
                Self::Unrepresentable { tensor, index }
            }
        }
    }
}

/// The coordinator of federated learning rounds.
///
/// It signs the global models with its own key pair and buffers the verified updates of the
/// current round until they are aggregated. There is no key registry: the caller supplies the
/// public key of every participant that submits an update.
///
/// Every update is checked against the architecture of the last published global model, or
/// against the buffered updates while no global model is published. A global model with a
/// different architecture published in the middle of a round doesn't touch the buffered
/// updates, which then still aggregate among themselves.
pub struct SecureAggregator<C = BinaryCodec> {
    keys: SigningKeyPair,
    codec: C,
    min_updates: usize,
    duplicates: DuplicatePolicy,
    global_model: Option<ParameterSet>,
    round: RoundState,
}

impl SecureAggregator<BinaryCodec> {
    /// Creates a coordinator with a freshly generated key pair and the default round settings.
    ///
    /// # Errors
    /// Fails if the crypto layer can't be initialized.
    pub fn new() -> Result<Self, InitError> {
        fedround_core::init()?;
        Ok(Self::with_keys(SigningKeyPair::generate()))
    }

    /// Creates a coordinator with a freshly generated key pair.
    ///
    /// # Errors
    /// Fails if the crypto layer can't be initialized.
    pub fn from_settings(settings: &RoundSettings) -> Result<Self, InitError> {
        Ok(Self::new()?
            .with_min_updates(settings.min_updates)
            .with_duplicate_policy(settings.duplicates))
    }

    /// Creates a coordinator with the given key pair.
    pub fn with_keys(keys: SigningKeyPair) -> Self {
        Self::with_codec(keys, BinaryCodec)
    }
}

impl<C> SecureAggregator<C>
where
    C: ParameterCodec,
{
    /// Creates a coordinator that exchanges models with the given codec.
    pub fn with_codec(keys: SigningKeyPair, codec: C) -> Self {
        Self {
            keys,
            codec,
            min_updates: MIN_QUORUM,
            duplicates: DuplicatePolicy::default(),
            global_model: None,
            round: RoundState::new(0),
        }
    }

    /// Sets the number of updates a round needs. It is never lower than [`MIN_QUORUM`].
    pub fn with_min_updates(mut self, min_updates: usize) -> Self {
        self.min_updates = min_updates.max(MIN_QUORUM);
        self
    }

    /// Sets how repeated updates of a participant are handled.
    pub fn with_duplicate_policy(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Gets the public key the participants verify the global models with.
    pub fn public_key(&self) -> CoordinatorPublicKey {
        self.keys.public
    }

    /// Gets the number of updates a round needs.
    pub fn min_updates(&self) -> usize {
        self.min_updates
    }

    /// Gets the identifier of the current round.
    pub fn round_id(&self) -> RoundId {
        self.round.id()
    }

    /// Gets the updates of the current round.
    pub fn round(&self) -> &RoundState {
        &self.round
    }

    /// Gets the last published global model.
    pub fn global_model(&self) -> Option<&ParameterSet> {
        self.global_model.as_ref()
    }

    /// Encodes and signs a global model, which becomes the reference architecture for the
    /// updates that arrive from now on.
    pub fn publish_global_model(&mut self, model: &ParameterSet) -> SignedMessage {
        if let Some((participant, _)) = self
            .round
            .updates()
            .find(|(_, update)| !update.is_compatible(model))
        {
            warn!(
                round_id = self.round.id(),
                %participant,
                "global model doesn't match the architecture of buffered updates",
            );
        }
        let payload = self.codec.encode(model);
        let message = self.sign(payload);
        info!(
            round_id = self.round.id(),
            digest = %message.digest(),
            "published global model",
        );
        self.global_model = Some(model.clone());
        message
    }

    /// Verifies and buffers the update of a participant.
    ///
    /// The signature is checked against `participant_pk`, the key the caller trusts for
    /// `participant`, before the payload is decoded.
    ///
    /// # Errors
    /// Fails if the signature doesn't verify, if the payload can't be decoded, if the update
    /// doesn't match the model architecture or holds non-finite values, or if the participant
    /// already submitted an update under [`DuplicatePolicy::Reject`]. The buffered updates are
    /// left untouched in all cases.
    pub fn receive_client_update(
        &mut self,
        participant: ParticipantId,
        payload: &[u8],
        signature: &[u8],
        participant_pk: &ParticipantPublicKey,
    ) -> Result<(), RoundError> {
        if !participant_pk.verify_raw(signature, payload) {
            warn!(round_id = self.round.id(), %participant, "rejecting update: invalid signature");
            return Err(RoundError::Authentication(participant));
        }
        let update = match self.codec.decode(payload) {
            Ok(update) => update,
            Err(error) => {
                warn!(round_id = self.round.id(), %participant, "rejecting update: {:#}", error);
                return Err(RoundError::Decode { participant, error });
            }
        };
        if let Err(error) = self.check_update(&participant, &update) {
            warn!(round_id = self.round.id(), %participant, "rejecting update: {}", error);
            return Err(error);
        }

        match self.duplicates {
            DuplicatePolicy::Overwrite => {
                if self.round.insert(participant.clone(), update).is_some() {
                    debug!(round_id = self.round.id(), %participant, "replaced update");
                } else {
                    debug!(round_id = self.round.id(), %participant, "accepted update");
                }
            }
            DuplicatePolicy::Reject => {
                if !self.round.insert_new(participant.clone(), update) {
                    warn!(round_id = self.round.id(), %participant, "rejecting repeated update");
                    return Err(RoundError::DuplicateUpdate(participant));
                }
                debug!(round_id = self.round.id(), %participant, "accepted update");
            }
        }
        Ok(())
    }

    /// Verifies and buffers a signed update.
    ///
    /// # Errors
    /// See [`receive_client_update()`](Self::receive_client_update).
    pub fn receive_message(
        &mut self,
        message: SignedMessage,
        participant_pk: &ParticipantPublicKey,
    ) -> Result<(), RoundError> {
        let SignedMessage {
            sender,
            payload,
            signature,
        } = message;
        self.receive_client_update(sender, &payload, signature.as_slice(), participant_pk)
    }

    /// Aggregates the buffered updates into the element-wise mean and encodes it.
    ///
    /// The buffered updates are kept, the caller decides when the round is over.
    ///
    /// # Errors
    /// Fails if fewer updates than the quorum are buffered.
    pub fn aggregate_updates(&self) -> Result<Vec<u8>, RoundError> {
        let model = self.round.mean(self.min_updates).map_err(|error| {
            warn!(round_id = self.round.id(), "aggregation failed: {}", error);
            RoundError::from(error)
        })?;
        info!(
            round_id = self.round.id(),
            participants = self.round.len(),
            "aggregated updates",
        );
        Ok(self.codec.encode(&model))
    }

    /// Signs an aggregated payload, returning the payload and its signature.
    pub fn send_aggregated_model(&self, payload: Vec<u8>) -> (Vec<u8>, Vec<u8>) {
        let signature = self.keys.secret.sign_detached(&payload);
        (payload, signature.as_slice().to_vec())
    }

    /// Aggregates the buffered updates and signs the result.
    ///
    /// # Errors
    /// See [`aggregate_updates()`](Self::aggregate_updates).
    pub fn aggregate_and_sign(&self) -> Result<SignedMessage, RoundError> {
        self.aggregate_updates().map(|payload| self.sign(payload))
    }

    /// Ends the current round and starts the next one.
    ///
    /// Returns the updates of the finished round.
    pub fn close_round(&mut self) -> RoundState {
        let next = RoundState::new(self.round.id() + 1);
        let finished = mem::replace(&mut self.round, next);
        info!(
            round_id = finished.id(),
            participants = finished.len(),
            "closed round",
        );
        finished
    }

    /// Aggregates the buffered updates, publishes their mean as the next global model and
    /// starts the next round.
    ///
    /// # Errors
    /// See [`aggregate_updates()`](Self::aggregate_updates). The round stays open on failure.
    pub fn finish_round(&mut self) -> Result<SignedMessage, RoundError> {
        let model = self
            .round
            .mean(self.min_updates)
            .map_err(RoundError::from)?;
        self.close_round();
        Ok(self.publish_global_model(&model))
    }

    fn sign(&self, payload: Vec<u8>) -> SignedMessage {
        SignedMessage::sign(COORDINATOR_ID.into(), payload, &self.keys.secret)
    }

    fn check_update(
        &self,
        participant: &ParticipantId,
        update: &ParameterSet,
    ) -> Result<(), RoundError> {
        let reference = self.global_model.as_ref().or_else(|| {
            self.round
                .updates()
                .find(|(other, _)| *other != participant)
                .map(|(_, update)| update)
        });
        if let Some(reference) = reference {
            if !reference.is_compatible(update) {
                return Err(RoundError::ShapeMismatch(format!(
                    "expected {:?}, got {:?}",
                    reference.architecture(),
                    update.architecture()
                )));
            }
        }
        match update.find_non_finite() {
            Some((tensor, index)) => Err(RoundError::NonFiniteValue { tensor, index }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use fedround_core::{
        model::{BincodeCodec, Tensor},
        testutils::{dense_layer, signing_keys, single_tensor},
    };

    use super::*;

    fn signed(params: &ParameterSet, keys: &SigningKeyPair) -> (Vec<u8>, Vec<u8>) {
        let payload = BinaryCodec.encode(params);
        let signature = keys.secret.sign_detached(&payload).as_slice().to_vec();
        (payload, signature)
    }

    fn submit(
        aggregator: &mut SecureAggregator,
        id: &str,
        params: &ParameterSet,
        seed: u8,
    ) -> Result<(), RoundError> {
        let keys = signing_keys(seed);
        let (payload, signature) = signed(params, &keys);
        aggregator.receive_client_update(id.into(), &payload, &signature, &keys.public)
    }

    fn aggregator() -> SecureAggregator {
        SecureAggregator::with_keys(signing_keys(0))
    }

    #[test]
    fn test_new_aggregator() {
        let aggregator = SecureAggregator::new().unwrap();
        assert_eq!(aggregator.round_id(), 0);
        assert_eq!(aggregator.min_updates(), MIN_QUORUM);
        assert!(aggregator.round().is_empty());
        assert!(aggregator.global_model().is_none());
    }

    #[test]
    fn test_min_updates_never_below_quorum() {
        assert_eq!(aggregator().with_min_updates(0).min_updates(), 2);
        assert_eq!(aggregator().with_min_updates(1).min_updates(), 2);
        assert_eq!(aggregator().with_min_updates(7).min_updates(), 7);
    }

    #[test]
    fn test_from_settings() {
        let settings = RoundSettings {
            min_updates: 3,
            duplicates: DuplicatePolicy::Reject,
        };
        let aggregator = SecureAggregator::from_settings(&settings).unwrap();
        assert_eq!(aggregator.min_updates(), 3);
        assert_eq!(aggregator.duplicates, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_publish_global_model() {
        let mut aggregator = aggregator();
        let message = aggregator.publish_global_model(&dense_layer(1.0));
        assert_eq!(message.sender.as_str(), COORDINATOR_ID);
        let payload = message.open(&aggregator.public_key()).unwrap();
        assert_eq!(BinaryCodec.decode(&payload).unwrap(), dense_layer(1.0));
        assert_eq!(aggregator.global_model(), Some(&dense_layer(1.0)));
    }

    #[test]
    fn test_receive_client_update() {
        let mut aggregator = aggregator();
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        assert_eq!(aggregator.round().len(), 1);
        assert_eq!(
            aggregator.round().get(&"alice".into()),
            Some(&dense_layer(1.0))
        );
    }

    #[test]
    fn test_receive_update_with_wrong_key() {
        let mut aggregator = aggregator();
        let (payload, signature) = signed(&dense_layer(1.0), &signing_keys(1));

        let error = aggregator
            .receive_client_update("alice".into(), &payload, &signature, &signing_keys(2).public)
            .unwrap_err();
        assert!(matches!(error, RoundError::Authentication(ref id) if id.as_str() == "alice"));
        assert!(aggregator.round().is_empty());
    }

    #[test]
    fn test_receive_update_with_malformed_signature() {
        let mut aggregator = aggregator();
        let keys = signing_keys(1);
        let (payload, signature) = signed(&dense_layer(1.0), &keys);

        for signature in &[&signature[..0], &signature[..63], &[0; 65][..]] {
            let error = aggregator
                .receive_client_update("alice".into(), &payload, signature, &keys.public)
                .unwrap_err();
            assert!(matches!(error, RoundError::Authentication(_)));
        }
        assert!(aggregator.round().is_empty());
    }

    #[test]
    fn test_receive_undecodable_update() {
        let mut aggregator = aggregator();
        let keys = signing_keys(1);
        let payload = vec![0, 0, 0, 1, 9];
        let signature = keys.secret.sign_detached(&payload);

        let error = aggregator
            .receive_client_update("alice".into(), &payload, signature.as_slice(), &keys.public)
            .unwrap_err();
        assert!(matches!(error, RoundError::Decode { .. }));
        assert!(aggregator.round().is_empty());
    }

    #[test]
    fn test_duplicate_overwrites() {
        let mut aggregator = aggregator();
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        submit(&mut aggregator, "alice", &dense_layer(9.0), 1).unwrap();
        submit(&mut aggregator, "bob", &dense_layer(3.0), 2).unwrap();

        assert_eq!(aggregator.round().len(), 2);
        let payload = aggregator.aggregate_updates().unwrap();
        assert_eq!(BinaryCodec.decode(&payload).unwrap(), dense_layer(6.0));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut aggregator = aggregator().with_duplicate_policy(DuplicatePolicy::Reject);
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        let error = submit(&mut aggregator, "alice", &dense_layer(9.0), 1).unwrap_err();
        assert!(matches!(error, RoundError::DuplicateUpdate(_)));
        assert_eq!(
            aggregator.round().get(&"alice".into()),
            Some(&dense_layer(1.0))
        );
    }

    #[test]
    fn test_shape_mismatch_against_buffered_update() {
        let mut aggregator = aggregator();
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        let error = submit(
            &mut aggregator,
            "bob",
            &single_tensor(vec![4], vec![1.0; 4]),
            2,
        )
        .unwrap_err();
        assert!(matches!(error, RoundError::ShapeMismatch(_)));
        assert_eq!(aggregator.round().len(), 1);
    }

    #[test]
    fn test_overwrite_may_change_architecture_of_single_update() {
        let mut aggregator = aggregator();
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        submit(
            &mut aggregator,
            "alice",
            &single_tensor(vec![4], vec![1.0; 4]),
            1,
        )
        .unwrap();
        assert_eq!(aggregator.round().len(), 1);
    }

    #[test]
    fn test_shape_mismatch_against_global_model() {
        let mut aggregator = aggregator();
        aggregator.publish_global_model(&dense_layer(0.0));
        let error = submit(
            &mut aggregator,
            "alice",
            &single_tensor(vec![2, 2], vec![1.0; 4]),
            1,
        )
        .unwrap_err();
        assert!(matches!(error, RoundError::ShapeMismatch(_)));
        assert!(aggregator.round().is_empty());
    }

    #[test]
    fn test_global_model_replaced_mid_round() {
        let mut aggregator = aggregator();
        aggregator.publish_global_model(&dense_layer(0.0));
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        submit(&mut aggregator, "bob", &dense_layer(3.0), 2).unwrap();

        let other = single_tensor(vec![4], vec![0.0; 4]);
        aggregator.publish_global_model(&other);
        assert_eq!(aggregator.round().len(), 2);
        let payload = aggregator.aggregate_updates().unwrap();
        assert_eq!(BinaryCodec.decode(&payload).unwrap(), dense_layer(2.0));

        // new updates follow the new global model
        let error = submit(&mut aggregator, "carol", &dense_layer(5.0), 3).unwrap_err();
        assert!(matches!(error, RoundError::ShapeMismatch(_)));
        submit(&mut aggregator, "carol", &other, 3).unwrap();
        assert!(matches!(
            aggregator.aggregate_updates(),
            Err(RoundError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_non_finite_update() {
        let mut aggregator = aggregator();
        let error = submit(
            &mut aggregator,
            "alice",
            &single_tensor(vec![3], vec![1.0, f32::NEG_INFINITY, 0.0]),
            1,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            RoundError::NonFiniteValue {
                tensor: 0,
                index: 1
            }
        ));
        assert!(aggregator.round().is_empty());
    }

    #[test]
    fn test_aggregate_requires_quorum() {
        let mut aggregator = aggregator();
        assert!(matches!(
            aggregator.aggregate_updates(),
            Err(RoundError::InsufficientParticipants {
                needed: 2,
                actual: 0
            })
        ));
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        assert!(matches!(
            aggregator.aggregate_updates(),
            Err(RoundError::InsufficientParticipants {
                needed: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_aggregate_with_higher_quorum() {
        let mut aggregator = aggregator().with_min_updates(3);
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        submit(&mut aggregator, "bob", &dense_layer(2.0), 2).unwrap();
        assert!(aggregator.aggregate_updates().is_err());
        submit(&mut aggregator, "carol", &dense_layer(3.0), 3).unwrap();
        let payload = aggregator.aggregate_updates().unwrap();
        assert_eq!(BinaryCodec.decode(&payload).unwrap(), dense_layer(2.0));
    }

    #[test]
    fn test_aggregate_keeps_round() {
        let mut aggregator = aggregator();
        submit(&mut aggregator, "alice", &single_tensor(vec![2, 2], vec![1., 2., 3., 4.]), 1)
            .unwrap();
        submit(&mut aggregator, "bob", &single_tensor(vec![2, 2], vec![3., 4., 5., 6.]), 2)
            .unwrap();

        let first = aggregator.aggregate_updates().unwrap();
        assert_eq!(aggregator.aggregate_updates().unwrap(), first);
        assert_eq!(aggregator.round().len(), 2);
        assert_eq!(
            BinaryCodec.decode(&first).unwrap(),
            single_tensor(vec![2, 2], vec![2., 3., 4., 5.])
        );
    }

    #[test]
    fn test_send_aggregated_model() {
        let aggregator = aggregator();
        let (payload, signature) = aggregator.send_aggregated_model(vec![1, 2, 3]);
        assert_eq!(payload, vec![1, 2, 3]);
        assert!(aggregator.public_key().verify_raw(&signature, &payload));
        assert!(!signing_keys(1).public.verify_raw(&signature, &payload));
    }

    #[test]
    fn test_receive_message() {
        let mut aggregator = aggregator();
        let keys = signing_keys(1);
        let message =
            SignedMessage::sign("alice".into(), BinaryCodec.encode(&dense_layer(1.0)), &keys.secret);
        aggregator.receive_message(message.clone(), &keys.public).unwrap();
        assert!(aggregator.round().contains(&"alice".into()));

        let forged = SignedMessage {
            sender: "bob".into(),
            ..message
        };
        assert!(matches!(
            aggregator.receive_message(forged, &signing_keys(2).public),
            Err(RoundError::Authentication(_))
        ));
    }

    #[test]
    fn test_close_round() {
        let mut aggregator = aggregator();
        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        submit(&mut aggregator, "bob", &dense_layer(3.0), 2).unwrap();

        let finished = aggregator.close_round();
        assert_eq!(finished.id(), 0);
        assert_eq!(finished.len(), 2);
        assert_eq!(aggregator.round_id(), 1);
        assert!(aggregator.round().is_empty());
    }

    #[test]
    fn test_finish_round() {
        let mut aggregator = aggregator();
        aggregator.publish_global_model(&dense_layer(0.0));
        assert!(aggregator.finish_round().is_err());
        assert_eq!(aggregator.round_id(), 0);

        submit(&mut aggregator, "alice", &dense_layer(1.0), 1).unwrap();
        submit(&mut aggregator, "bob", &dense_layer(3.0), 2).unwrap();
        let message = aggregator.finish_round().unwrap();

        assert_eq!(aggregator.round_id(), 1);
        assert!(aggregator.round().is_empty());
        assert_eq!(aggregator.global_model(), Some(&dense_layer(2.0)));
        let payload = message.open(&aggregator.public_key()).unwrap();
        assert_eq!(BinaryCodec.decode(&payload).unwrap(), dense_layer(2.0));
    }

    #[test]
    fn test_aggregator_with_bincode_codec() {
        let mut aggregator = SecureAggregator::with_codec(signing_keys(0), BincodeCodec);
        for (seed, value) in [(1_u8, 1.0), (2, 2.0)].iter() {
            let keys = signing_keys(*seed);
            let params =
                ParameterSet::new(vec![Tensor::from_f64(vec![2], vec![*value; 2]).unwrap()]);
            let payload = BincodeCodec.encode(&params);
            let signature = keys.secret.sign_detached(&payload);
            aggregator
                .receive_client_update(
                    format!("participant-{}", seed).into(),
                    &payload,
                    signature.as_slice(),
                    &keys.public,
                )
                .unwrap();
        }
        let payload = aggregator.aggregate_updates().unwrap();
        assert_eq!(
            BincodeCodec.decode(&payload).unwrap()[0].as_f64().unwrap(),
            &[1.5, 1.5]
        );
    }
}
