//! This module provides the `CoordinatorRequest`, `RequestSender` and `RequestReceiver` types.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use derive_more::From;
use displaydoc::Display;
use futures::Stream;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, Span};

use fedround_core::{message::SignedMessage, ParticipantPublicKey};

use crate::aggregator::RoundError;

/// Errors which can occur while the coordinator handles a request.
#[derive(Debug, Display, Error)]
pub enum RequestError {
    /// The request was rejected: {0}.
    Rejected(#[from] RoundError),
    /// The request could not be processed due to an internal error: {0}.
    InternalError(&'static str),
}

/// An update request.
#[derive(Debug)]
pub struct UpdateRequest {
    /// The signed update of the participant.
    pub message: SignedMessage,
    /// The public key the caller trusts for the sender of the message.
    pub participant_pk: ParticipantPublicKey,
}

/// A [`CoordinatorService`] request.
///
/// [`CoordinatorService`]: crate::services::CoordinatorService
#[derive(Debug, From)]
pub enum CoordinatorRequest {
    /// Verifies and buffers an update.
    Update(UpdateRequest),
    /// Aggregates the buffered updates and signs the mean, keeping the round open.
    Aggregate,
    /// Aggregates the buffered updates, publishes the mean as the next global model and starts
    /// the next round.
    CloseRound,
}

/// The answer to a [`CoordinatorRequest`].
#[derive(Debug)]
pub enum CoordinatorResponse {
    /// The update was buffered.
    Accepted,
    /// The signed mean of the buffered updates.
    Aggregated(SignedMessage),
    /// The signed global model of the next round.
    RoundClosed(SignedMessage),
}

/// A handle to send requests to the [`CoordinatorService`].
///
/// [`CoordinatorService`]: crate::services::CoordinatorService
#[derive(Clone, From, Debug)]
pub struct RequestSender(mpsc::UnboundedSender<(CoordinatorRequest, Span, ResponseSender)>);

impl RequestSender {
    /// Sends a request to the [`CoordinatorService`].
    ///
    /// # Errors
    /// Fails if the request is rejected or if the [`CoordinatorService`] has already shut down
    /// and the `Request` channel has been closed as a result.
    ///
    /// [`CoordinatorService`]: crate::services::CoordinatorService
    pub async fn request(
        &self,
        req: CoordinatorRequest,
        span: Span,
    ) -> Result<CoordinatorResponse, RequestError> {
        let (resp_tx, resp_rx) = oneshot::channel::<Result<CoordinatorResponse, RequestError>>();
        self.0.send((req, span, resp_tx)).map_err(|_| {
            RequestError::InternalError(
                "failed to send request to the coordinator: coordinator is shutting down",
            )
        })?;
        resp_rx.await.map_err(|_| {
            RequestError::InternalError("failed to receive response from the coordinator")
        })?
    }

    /// Submits a signed update.
    ///
    /// # Errors
    /// See [`request()`](Self::request).
    pub async fn submit_update(
        &self,
        message: SignedMessage,
        participant_pk: ParticipantPublicKey,
        span: Span,
    ) -> Result<(), RequestError> {
        let req = UpdateRequest {
            message,
            participant_pk,
        };
        match self.request(req.into(), span).await? {
            CoordinatorResponse::Accepted => Ok(()),
            _ => Err(RequestError::InternalError("unexpected response to an update")),
        }
    }

    /// Requests the signed mean of the buffered updates.
    ///
    /// # Errors
    /// See [`request()`](Self::request).
    pub async fn aggregate(&self, span: Span) -> Result<SignedMessage, RequestError> {
        match self.request(CoordinatorRequest::Aggregate, span).await? {
            CoordinatorResponse::Aggregated(message) => Ok(message),
            _ => Err(RequestError::InternalError(
                "unexpected response to an aggregation",
            )),
        }
    }

    /// Closes the current round and returns the signed global model of the next one.
    ///
    /// # Errors
    /// See [`request()`](Self::request).
    pub async fn close_round(&self, span: Span) -> Result<SignedMessage, RequestError> {
        match self.request(CoordinatorRequest::CloseRound, span).await? {
            CoordinatorResponse::RoundClosed(message) => Ok(message),
            _ => Err(RequestError::InternalError(
                "unexpected response to closing a round",
            )),
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// A channel for the coordinator to send the response to a [`CoordinatorRequest`].
pub(crate) type ResponseSender = oneshot::Sender<Result<CoordinatorResponse, RequestError>>;

/// The receiver half of the `Request` channel that is used by the [`CoordinatorService`] to
/// receive requests.
///
/// [`CoordinatorService`]: crate::services::CoordinatorService
#[derive(From, Debug)]
pub struct RequestReceiver(mpsc::UnboundedReceiver<(CoordinatorRequest, Span, ResponseSender)>);

impl Stream for RequestReceiver {
    type Item = (CoordinatorRequest, Span, ResponseSender);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        trace!("RequestReceiver: polling");
        Pin::new(&mut self.get_mut().0).poll_recv(cx)
    }
}

impl RequestReceiver {
    /// Creates a new `Request` channel and returns the [`RequestReceiver`] as well as the
    /// [`RequestSender`] half.
    pub fn new() -> (Self, RequestSender) {
        let (tx, rx) = mpsc::unbounded_channel::<(CoordinatorRequest, Span, ResponseSender)>();
        let receiver = RequestReceiver::from(rx);
        let handle = RequestSender::from(tx);
        (receiver, handle)
    }

    /// Closes the `Request` channel.
    ///
    /// Requests that are already queued can still be received.
    pub fn close(&mut self) {
        self.0.close()
    }
}
