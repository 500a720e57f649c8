use thiserror::Error;

/// Reason code the broker reports when a wait interval expires on an empty queue.
pub const REASON_NO_MSG_AVAILABLE: i32 = 2033;
/// Reason code for a queue name the broker does not know.
pub const REASON_UNKNOWN_OBJECT_NAME: i32 = 2085;
/// Reason code for an operation attempted after the connection is gone.
pub const REASON_CONNECTION_BROKEN: i32 = 2009;
/// Reason code for a handle that was never opened or is already closed.
pub const REASON_HANDLE_ERROR: i32 = 2019;

/// Errors reported by a [`crate::domain::ports::QueueTransport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("no message available (reason 2033)")]
    NoMessageAvailable,
    #[error("unknown queue '{0}' (reason 2085)")]
    UnknownQueue(String),
    #[error("connection broken (reason 2009)")]
    ConnectionBroken,
    #[error("invalid queue handle {0} (reason 2019)")]
    InvalidHandle(u64),
    #[error("broker error (reason {reason}): {message}")]
    Broker { reason: i32, message: String },
}

impl TransportError {
    /// Broker reason code carried by this error.
    pub fn reason_code(&self) -> i32 {
        match self {
            TransportError::NoMessageAvailable => REASON_NO_MSG_AVAILABLE,
            TransportError::UnknownQueue(_) => REASON_UNKNOWN_OBJECT_NAME,
            TransportError::ConnectionBroken => REASON_CONNECTION_BROKEN,
            TransportError::InvalidHandle(_) => REASON_HANDLE_ERROR,
            TransportError::Broker { reason, .. } => *reason,
        }
    }

    /// The only transport condition treated as control flow rather than failure.
    pub fn is_no_message(&self) -> bool {
        matches!(self, TransportError::NoMessageAvailable)
    }
}

/// A reply record could not be turned into bytes.
#[derive(Error, Debug)]
#[error("unable to encode reply: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Run-level failures. Anything that reaches this type ends the run.
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("unable to establish connection to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: TransportError,
    },
    #[error("unable to open source queue '{queue}': {source}")]
    SourceOpen {
        queue: String,
        #[source]
        source: TransportError,
    },
    #[error("unable to open reply destination '{queue}': {source}")]
    DestinationOpen {
        queue: String,
        #[source]
        source: TransportError,
    },
    #[error("receive failed: {0}")]
    Receive(#[source] TransportError),
    #[error("unit of work could not be resolved: {0}")]
    Syncpoint(#[source] TransportError),
    #[error("invalid request on line {line}: {reason}")]
    InvalidRequest { line: usize, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResponderError>;
