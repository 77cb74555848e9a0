//! Rounds between one coordinator and simulated participants in the same process.

use anyhow::{anyhow, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{info, Instrument};

use fedround_core::{
    message::SignedMessage,
    model::{BinaryCodec, ParameterCodec, ParameterSet, Tensor},
    CoordinatorPublicKey,
};
use fedround_sdk::Participant;
use fedround_server::{
    services::{self, participant_span, RequestSender},
    SecureAggregator,
};

use crate::trainer::{local_data, MeanSeeker};

/// The shape of a simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// The number of participants.
    pub participants: usize,
    /// The number of rounds.
    pub rounds: usize,
    /// The number of rows of the weight matrix.
    pub rows: usize,
    /// The number of columns of the weight matrix and the length of the bias vector.
    pub cols: usize,
    /// The number of passes over the local data per round.
    pub epochs: usize,
    /// The number of local batches per participant.
    pub batches: usize,
    /// The seed of the initial model and of the local data.
    pub seed: u64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            participants: 3,
            rounds: 1,
            rows: 5,
            cols: 5,
            epochs: 1,
            batches: 2,
            seed: 0,
        }
    }
}

impl Simulation {
    /// Creates a random dense layer: a `rows x cols` weight matrix and a bias vector.
    pub fn initial_model(&self) -> anyhow::Result<ParameterSet> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut random = |len: usize| -> Vec<f32> { (0..len).map(|_| rng.gen()).collect() };
        Ok(ParameterSet::new(vec![
            Tensor::from_f32(vec![self.rows, self.cols], random(self.rows * self.cols))?,
            Tensor::from_f32(vec![self.cols], random(self.cols))?,
        ]))
    }

    /// Runs all rounds and returns the final global model.
    ///
    /// # Errors
    /// Fails if a participant rejects a global model or the coordinator rejects an update.
    pub async fn run(&self, mut aggregator: SecureAggregator) -> anyhow::Result<ParameterSet> {
        let coordinator_pk = aggregator.public_key();
        let mut global = aggregator.publish_global_model(&self.initial_model()?);
        let (handle, sender) = services::spawn(aggregator);

        let mut participants = (0..self.participants)
            .map(|index| Participant::new(format!("participant-{}", index)))
            .collect::<Result<Vec<_>, _>>()?;

        for round in 0..self.rounds {
            info!(round, participants = participants.len(), "starting round");
            let tasks = participants.into_iter().enumerate().map(|(index, participant)| {
                let data = local_data(self.seed ^ (index as u64 + 1), self.batches, 8);
                let span = participant_span(participant.id().as_str());
                tokio::spawn(
                    participate(
                        participant,
                        global.clone(),
                        coordinator_pk,
                        data,
                        self.epochs,
                        sender.clone(),
                    )
                    .instrument(span),
                )
            });
            participants = futures::future::try_join_all(tasks)
                .await?
                .into_iter()
                .collect::<anyhow::Result<_>>()?;

            global = sender
                .close_round(tracing::Span::current())
                .await
                .with_context(|| format!("failed to close round {}", round))?;
            info!(round, digest = %global.digest(), "finished round");
        }

        drop(sender);
        handle.await?;
        if !global.verify(&coordinator_pk) {
            return Err(anyhow!("final global model has an invalid signature"));
        }
        BinaryCodec.decode(&global.payload)
    }
}

async fn participate(
    mut participant: Participant,
    global: SignedMessage,
    coordinator_pk: CoordinatorPublicKey,
    data: Vec<Vec<f64>>,
    epochs: usize,
    sender: RequestSender,
) -> anyhow::Result<Participant> {
    participant.receive_signed_model(&global, &coordinator_pk)?;
    let participant = tokio::task::spawn_blocking(move || {
        let mut trainer = MeanSeeker { learning_rate: 0.1 };
        participant
            .train_local_model(&mut trainer, &data, epochs)
            .map(|_| participant)
    })
    .await??;
    let update = participant.compose_update()?;
    sender
        .submit_update(update, participant.public_key(), tracing::Span::current())
        .await?;
    Ok(participant)
}
