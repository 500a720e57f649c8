use crate::domain::envelope::IncomingEnvelope;
use crate::domain::ports::{QueueHandle, QueueTransport};
use crate::domain::syncpoint::Syncpoint;
use crate::error::TransportError;
use std::time::Duration;

pub const DEFAULT_MAX_EMPTY_RETRIES: u32 = 10;
pub const DEFAULT_WAIT: Duration = Duration::from_secs(3);

/// How long to wait per receive and how many idle waits end the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_empty_retries: u32,
    pub wait: Duration,
}

impl RetryPolicy {
    /// A budget of zero would never terminate, so it is raised to one.
    pub fn new(max_empty_retries: u32, wait: Duration) -> Self {
        Self {
            max_empty_retries: max_empty_retries.max(1),
            wait,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EMPTY_RETRIES, DEFAULT_WAIT)
    }
}

/// Where the receive loop stands.
///
/// `Polling` counts the idle waits still allowed. The count drops on every
/// empty receive and returns to the maximum only once a message is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Polling { remaining: u32 },
    Empty,
    Fatal(TransportError),
}

impl RetryState {
    pub fn start(policy: &RetryPolicy) -> Self {
        RetryState::Polling {
            remaining: policy.max_empty_retries,
        }
    }

    pub fn on_empty(self) -> Self {
        match self {
            RetryState::Polling { remaining } if remaining > 1 => RetryState::Polling {
                remaining: remaining - 1,
            },
            RetryState::Polling { .. } => RetryState::Empty,
            terminal => terminal,
        }
    }

    pub fn on_committed(self, policy: &RetryPolicy) -> Self {
        match self {
            RetryState::Polling { .. } => RetryState::start(policy),
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Polling { .. })
    }
}

/// A received request together with the unit of work it was received in.
pub struct Inbound<'t> {
    pub payload: Vec<u8>,
    pub envelope: IncomingEnvelope,
    pub syncpoint: Syncpoint<'t>,
}

/// What one call to [`ReceiveLoop::next`] produced.
pub enum Next<'t> {
    Message(Inbound<'t>),
    /// The idle budget is spent.
    Empty,
    Fatal(TransportError),
}

/// Polls a source queue under syncpoint, absorbing idle waits until the
/// budget runs out.
pub struct ReceiveLoop<'t> {
    transport: &'t dyn QueueTransport,
    source: &'t QueueHandle,
    policy: RetryPolicy,
}

impl<'t> ReceiveLoop<'t> {
    pub fn new(
        transport: &'t dyn QueueTransport,
        source: &'t QueueHandle,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            source,
            policy,
        }
    }

    pub async fn next(&self, mut state: RetryState) -> (RetryState, Next<'t>) {
        loop {
            match state {
                RetryState::Polling { remaining } => {
                    let syncpoint = Syncpoint::begin(self.transport);
                    match syncpoint.receive(self.source, self.policy.wait).await {
                        Ok(received) => {
                            let inbound = Inbound {
                                payload: received.payload,
                                envelope: received.envelope,
                                syncpoint,
                            };
                            return (state, Next::Message(inbound));
                        }
                        Err(error) if error.is_no_message() => {
                            if let Err(rollback) = syncpoint.rollback().await {
                                tracing::error!(
                                    error = %rollback,
                                    "unable to release idle unit of work"
                                );
                                return (
                                    RetryState::Fatal(rollback.clone()),
                                    Next::Fatal(rollback),
                                );
                            }
                            tracing::debug!(
                                remaining = remaining.saturating_sub(1),
                                "no message available"
                            );
                            state = state.on_empty();
                        }
                        Err(error) => {
                            tracing::error!(
                                error = %error,
                                reason = error.reason_code(),
                                queue = %self.source.name,
                                "receive failed"
                            );
                            if let Err(rollback) = syncpoint.rollback().await {
                                tracing::debug!(
                                    error = %rollback,
                                    "rollback after failed receive also failed"
                                );
                            }
                            return (RetryState::Fatal(error.clone()), Next::Fatal(error));
                        }
                    }
                }
                RetryState::Empty => {
                    tracing::info!(
                        attempts = self.policy.max_empty_retries,
                        queue = %self.source.name,
                        "no messages after retry budget, stopping"
                    );
                    return (RetryState::Empty, Next::Empty);
                }
                RetryState::Fatal(error) => {
                    return (RetryState::Fatal(error.clone()), Next::Fatal(error));
                }
            }
        }
    }
}
