use super::envelope::{IncomingEnvelope, OutgoingEnvelope};
use crate::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open for receiving.
    Input,
    /// Open for sending.
    Output,
}

/// Names a queue and what it is opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSelector {
    pub name: String,
    pub mode: OpenMode,
}

impl QueueSelector {
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: OpenMode::Input,
        }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: OpenMode::Output,
        }
    }
}

/// An open queue. Returned by [`QueueTransport::open`] and given back to
/// [`QueueTransport::close`].
#[derive(Debug, PartialEq, Eq)]
pub struct QueueHandle {
    pub id: u64,
    pub name: String,
    pub mode: OpenMode,
}

/// Whether an operation joins the current unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Syncpoint,
    Immediate,
}

/// A message taken off a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub payload: Vec<u8>,
    pub envelope: IncomingEnvelope,
}

/// The capability the responder needs from a message broker connection.
///
/// A connection has at most one open unit of work. Operations made with
/// [`Delivery::Syncpoint`] join it until `commit` or `rollback`.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    async fn open(&self, selector: &QueueSelector) -> Result<QueueHandle, TransportError>;

    /// Waits up to `wait` for a message. An idle queue reports
    /// [`TransportError::NoMessageAvailable`].
    async fn receive(
        &self,
        handle: &QueueHandle,
        wait: Duration,
        delivery: Delivery,
    ) -> Result<Received, TransportError>;

    async fn send(
        &self,
        handle: &QueueHandle,
        payload: &[u8],
        envelope: OutgoingEnvelope,
        delivery: Delivery,
    ) -> Result<(), TransportError>;

    async fn commit(&self) -> Result<(), TransportError>;
    async fn rollback(&self) -> Result<(), TransportError>;
    async fn close(&self, handle: QueueHandle) -> Result<(), TransportError>;
}

/// Where and as whom to connect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub connection: String,
    pub queue_manager: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Establishes transport connections.
#[async_trait]
pub trait QueueConnector: Send + Sync {
    async fn connect(&self, target: &ConnectionTarget) -> Result<QueueTransportBox, TransportError>;
}

pub type QueueTransportBox = Box<dyn QueueTransport>;
