//! The coordinator service.
//!
//! A [`CoordinatorService`] runs in its own task and is the single owner of a
//! [`SecureAggregator`]. Participants talk to it through cloneable [`RequestSender`]s, so any
//! number of them can submit updates concurrently while the buffered updates are only ever
//! touched by one task, one request at a time. An aggregation therefore always sees a
//! consistent set of updates.

pub mod requests;

use futures::StreamExt;
use tracing::{debug, warn, Span};

use fedround_core::model::{BinaryCodec, ParameterCodec};

pub use self::requests::{
    CoordinatorRequest,
    CoordinatorResponse,
    RequestError,
    RequestReceiver,
    RequestSender,
    UpdateRequest,
};
use crate::aggregator::SecureAggregator;

/// The task that owns the coordinator of a round.
pub struct CoordinatorService<C = BinaryCodec> {
    aggregator: SecureAggregator<C>,
    requests: RequestReceiver,
}

impl<C> CoordinatorService<C>
where
    C: ParameterCodec,
{
    /// Creates a new service and the handle to send it requests.
    pub fn new(aggregator: SecureAggregator<C>) -> (Self, RequestSender) {
        let (requests, sender) = RequestReceiver::new();
        (
            Self {
                aggregator,
                requests,
            },
            sender,
        )
    }

    /// Gets the coordinator.
    pub fn aggregator(&self) -> &SecureAggregator<C> {
        &self.aggregator
    }

    /// Handles requests until every [`RequestSender`] is dropped and returns the coordinator.
    pub async fn run(mut self) -> SecureAggregator<C> {
        while let Some((req, span, resp_tx)) = self.requests.next().await {
            let response = span.in_scope(|| self.handle(req));
            // the requester may have given up waiting
            if resp_tx.send(response).is_err() {
                warn!("failed to send response: requester dropped");
            }
        }
        debug!("request channel closed, shutting down");
        self.aggregator
    }

    fn handle(&mut self, req: CoordinatorRequest) -> Result<CoordinatorResponse, RequestError> {
        match req {
            CoordinatorRequest::Update(UpdateRequest {
                message,
                participant_pk,
            }) => self
                .aggregator
                .receive_message(message, &participant_pk)
                .map(|_| CoordinatorResponse::Accepted),
            CoordinatorRequest::Aggregate => self
                .aggregator
                .aggregate_and_sign()
                .map(CoordinatorResponse::Aggregated),
            CoordinatorRequest::CloseRound => self
                .aggregator
                .finish_round()
                .map(CoordinatorResponse::RoundClosed),
        }
        .map_err(RequestError::from)
    }
}

/// Spawns a [`CoordinatorService`] on the current tokio runtime.
///
/// The returned handle resolves to the coordinator once every [`RequestSender`] is dropped.
pub fn spawn<C>(
    aggregator: SecureAggregator<C>,
) -> (tokio::task::JoinHandle<SecureAggregator<C>>, RequestSender)
where
    C: ParameterCodec + 'static,
{
    let (service, sender) = CoordinatorService::new(aggregator);
    let handle = tokio::spawn(service.run());
    (handle, sender)
}

/// Creates a span for the requests of a participant.
pub fn participant_span(participant: &str) -> Span {
    tracing::info_span!("participant", id = participant)
}
