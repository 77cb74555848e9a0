//! The updates buffered in one round.

use std::collections::{btree_map::Entry, BTreeMap};

use fedround_core::{
    model::{mean, AggregationError, ParameterSet},
    ParticipantId,
};

/// The round identifier.
pub type RoundId = u64;

#[derive(Debug, Clone, Default, PartialEq)]
/// The updates of one aggregation round, keyed by the identity of their participant.
///
/// A round holds at most one update per participant. It is created empty when the round
/// starts and consumed when the round is closed.
pub struct RoundState {
    id: RoundId,
    updates: BTreeMap<ParticipantId, ParameterSet>,
}

impl RoundState {
    /// Creates an empty round.
    pub fn new(id: RoundId) -> Self {
        Self {
            id,
            updates: BTreeMap::new(),
        }
    }

    /// Gets the round identifier.
    pub fn id(&self) -> RoundId {
        self.id
    }

    /// Gets the number of buffered updates.
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Checks whether no update is buffered.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Checks whether the participant already submitted an update.
    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.updates.contains_key(participant)
    }

    /// Gets the update of a participant.
    pub fn get(&self, participant: &ParticipantId) -> Option<&ParameterSet> {
        self.updates.get(participant)
    }

    /// Gets the participants that submitted an update, in ascending order.
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.updates.keys()
    }

    /// Gets the buffered updates, ordered by participant.
    pub fn updates(&self) -> impl Iterator<Item = (&ParticipantId, &ParameterSet)> {
        self.updates.iter()
    }

    /// Buffers the update of a participant and returns the update it replaces, if any.
    pub fn insert(
        &mut self,
        participant: ParticipantId,
        update: ParameterSet,
    ) -> Option<ParameterSet> {
        self.updates.insert(participant, update)
    }

    /// Buffers the update of a participant unless it already submitted one.
    ///
    /// Returns `false` and leaves the round untouched for a repeated submission.
    pub fn insert_new(&mut self, participant: ParticipantId, update: ParameterSet) -> bool {
        match self.updates.entry(participant) {
            Entry::Vacant(entry) => {
                entry.insert(update);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Computes the element-wise mean of the buffered updates.
    ///
    /// # Errors
    /// Fails if fewer than `quorum` updates are buffered or the updates can't be aggregated.
    pub fn mean(&self, quorum: usize) -> Result<ParameterSet, AggregationError> {
        mean(self.updates.values(), quorum)
    }

    /// Consumes the round and returns its updates.
    pub fn into_updates(self) -> BTreeMap<ParticipantId, ParameterSet> {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use fedround_core::testutils::dense_layer;

    use super::*;

    #[test]
    fn test_insert_overwrites() {
        let mut round = RoundState::new(3);
        assert!(round.is_empty());
        assert_eq!(round.insert("alice".into(), dense_layer(1.0)), None);
        assert_eq!(
            round.insert("alice".into(), dense_layer(2.0)),
            Some(dense_layer(1.0))
        );
        assert_eq!(round.id(), 3);
        assert_eq!(round.len(), 1);
        assert_eq!(round.get(&"alice".into()), Some(&dense_layer(2.0)));
    }

    #[test]
    fn test_insert_new_keeps_first() {
        let mut round = RoundState::new(0);
        assert!(round.insert_new("alice".into(), dense_layer(1.0)));
        assert!(!round.insert_new("alice".into(), dense_layer(2.0)));
        assert_eq!(round.get(&"alice".into()), Some(&dense_layer(1.0)));
    }

    #[test]
    fn test_participants_are_ordered() {
        let mut round = RoundState::new(0);
        round.insert("carol".into(), dense_layer(1.0));
        round.insert("alice".into(), dense_layer(1.0));
        round.insert("bob".into(), dense_layer(1.0));
        let participants: Vec<_> = round.participants().map(ParticipantId::as_str).collect();
        assert_eq!(participants, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_mean() {
        let mut round = RoundState::new(0);
        round.insert("alice".into(), dense_layer(1.0));
        assert_eq!(
            round.mean(2),
            Err(AggregationError::InsufficientParticipants {
                needed: 2,
                actual: 1
            })
        );
        round.insert("bob".into(), dense_layer(4.0));
        assert_eq!(round.mean(2).unwrap(), dense_layer(2.5));
        assert_eq!(round.into_updates().len(), 2);
    }
}
