use crate::application::receiver::{Inbound, Next, ReceiveLoop, RetryPolicy, RetryState};
use crate::application::transform::ReplyTransform;
use crate::domain::correlation::build_outgoing_envelope;
use crate::domain::envelope::OutgoingEnvelope;
use crate::domain::ports::{QueueHandle, QueueSelector, QueueTransportBox};
use crate::domain::syncpoint::Syncpoint;
use crate::error::{EncodeError, ResponderError, Result, TransportError};
use crate::interfaces::json::codec;
use tracing::Instrument;

/// Why a message was rolled back.
#[derive(Debug)]
pub enum RollbackCause {
    Encode(EncodeError),
    Send(TransportError),
}

/// How a single request ended.
#[derive(Debug)]
pub enum Outcome {
    /// The request was consumed and its reply delivered.
    Committed,
    /// The request is back on the source queue and no reply was delivered.
    RolledBack { cause: RollbackCause },
}

/// Totals for one run of the responder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub committed: usize,
    pub rolled_back: usize,
}

/// Answers requests from a source queue, one unit of work per request.
///
/// `Responder` owns the transport connection for the duration of a run. Each
/// request is received, transformed and replied to inside a single syncpoint,
/// so the request is consumed if and only if its reply is delivered.
pub struct Responder {
    transport: QueueTransportBox,
    source_queue: String,
    fallback_reply_queue: Option<String>,
    policy: RetryPolicy,
    transform: Box<dyn ReplyTransform>,
    span: tracing::Span,
}

impl Responder {
    /// Creates a new `Responder` with the default retry policy.
    ///
    /// # Arguments
    ///
    /// * `transport` - The connection the responder takes ownership of.
    /// * `source_queue` - The queue requests are read from.
    /// * `transform` - Computes each reply from its request.
    pub fn new(
        transport: QueueTransportBox,
        source_queue: impl Into<String>,
        transform: Box<dyn ReplyTransform>,
    ) -> Self {
        let source_queue = source_queue.into();
        let span = tracing::info_span!("responder", queue = %source_queue);
        Self {
            transport,
            source_queue,
            fallback_reply_queue: None,
            policy: RetryPolicy::default(),
            transform,
            span,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Queue used for requests that do not name a reply queue.
    pub fn with_fallback_reply_queue(mut self, queue: Option<String>) -> Self {
        self.fallback_reply_queue = queue.filter(|name| !name.trim().is_empty());
        self
    }

    /// Span every log line of this responder is recorded in.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Serves requests until the source queue stays idle for the whole retry
    /// budget (`Ok`) or a run-level failure occurs (`Err`).
    pub async fn run(&self) -> Result<RunSummary> {
        self.serve().instrument(self.span.clone()).await
    }

    async fn serve(&self) -> Result<RunSummary> {
        tracing::info!(
            max_empty_retries = self.policy.max_empty_retries,
            wait_ms = self.policy.wait.as_millis() as u64,
            "getting messages from queue"
        );
        let source = self
            .transport
            .open(&QueueSelector::input(&self.source_queue))
            .await
            .map_err(|source| ResponderError::SourceOpen {
                queue: self.source_queue.clone(),
                source,
            })?;

        let result = self.poll(&source).await;

        if let Err(error) = self.transport.close(source).await {
            tracing::warn!(error = %error, "unable to close source queue");
        }
        if let Ok(summary) = &result {
            tracing::info!(
                committed = summary.committed,
                rolled_back = summary.rolled_back,
                "responder finished"
            );
        }
        result
    }

    async fn poll(&self, source: &QueueHandle) -> Result<RunSummary> {
        let receiver = ReceiveLoop::new(self.transport.as_ref(), source, self.policy);
        let mut summary = RunSummary::default();
        let mut state = RetryState::start(&self.policy);

        loop {
            let (next_state, next) = receiver.next(state).await;
            state = next_state;
            match next {
                Next::Message(inbound) => match self.handle(inbound).await? {
                    Outcome::Committed => {
                        summary.committed += 1;
                        state = state.on_committed(&self.policy);
                    }
                    Outcome::RolledBack { .. } => summary.rolled_back += 1,
                },
                Next::Empty => return Ok(summary),
                Next::Fatal(error) => return Err(ResponderError::Receive(error)),
            }
        }
    }

    /// Replies to one received request and resolves its unit of work.
    ///
    /// Per-message failures come back as [`Outcome::RolledBack`]. An `Err` means
    /// the run cannot continue.
    pub async fn respond(&self, inbound: Inbound<'_>) -> Result<Outcome> {
        self.handle(inbound).instrument(self.span.clone()).await
    }

    async fn handle(&self, inbound: Inbound<'_>) -> Result<Outcome> {
        let Inbound {
            payload,
            envelope,
            syncpoint,
        } = inbound;
        tracing::info!(
            length = payload.len(),
            message_id = %envelope.message_id,
            format = envelope.format.as_str(),
            "got message"
        );
        tracing::debug!(payload = %String::from_utf8_lossy(&payload), "request body");

        let decoded = codec::decode(&payload);
        if let Some(warning) = &decoded.warning {
            tracing::warn!(%warning, "replying to request with default fields");
        }
        tracing::debug!(
            greeting = %decoded.record.greeting,
            request_message = %decoded.record.message,
            value = decoded.record.value,
            "found request fields"
        );

        let reply = self.transform.transform(&decoded.record);
        let data = match codec::encode(&reply) {
            Ok(data) => data,
            Err(error) => {
                tracing::error!(%error, "unexpected error encoding reply");
                return Self::back_out(syncpoint, RollbackCause::Encode(error)).await;
            }
        };

        let reply_queue = match envelope.reply_to.trim() {
            "" => self.fallback_reply_queue.clone().unwrap_or_default(),
            named => named.to_string(),
        };
        let destination = match self
            .transport
            .open(&QueueSelector::output(&reply_queue))
            .await
        {
            Ok(handle) => handle,
            Err(source) => {
                tracing::error!(
                    queue = %reply_queue,
                    error = %source,
                    "unable to open reply queue"
                );
                if let Err(error) = syncpoint.rollback().await {
                    tracing::warn!(%error, "rollback before stopping failed");
                }
                return Err(ResponderError::DestinationOpen {
                    queue: reply_queue,
                    source,
                });
            }
        };

        if envelope.correlation_id.is_unset() {
            tracing::debug!("correlation id is empty, correlating on message id");
        } else {
            tracing::debug!("correlation id found on request");
        }
        let outgoing = OutgoingEnvelope {
            destination: reply_queue.clone(),
            ..build_outgoing_envelope(&envelope)
        };
        let correlation_id = outgoing.correlation_id.clone();

        tracing::debug!(body = %String::from_utf8_lossy(&data), "sending reply");
        let sent = syncpoint.send(&destination, &data, outgoing).await;
        if let Err(error) = self.transport.close(destination).await {
            tracing::warn!(queue = %reply_queue, %error, "unable to close reply queue");
        }

        match sent {
            Ok(()) => {
                syncpoint.commit().await.map_err(ResponderError::Syncpoint)?;
                tracing::info!(
                    queue = %reply_queue,
                    correlation_id = %correlation_id,
                    "response message committed"
                );
                Ok(Outcome::Committed)
            }
            Err(error) => {
                tracing::error!(queue = %reply_queue, %error, "unable to send reply");
                Self::back_out(syncpoint, RollbackCause::Send(error)).await
            }
        }
    }

    async fn back_out(syncpoint: Syncpoint<'_>, cause: RollbackCause) -> Result<Outcome> {
        tracing::info!("rolling back message");
        syncpoint.rollback().await.map_err(ResponderError::Syncpoint)?;
        Ok(Outcome::RolledBack { cause })
    }
}
