use std::fmt;

/// Width of message and correlation identifiers on the wire.
pub const ID_LENGTH: usize = 24;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            /// Parses a hex rendering such as the one produced by `Display`.
            pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
                hex::decode(text).map(Self)
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(&self.0)
            }

            /// Empty identifiers, or ones holding a full-width run of zero
            /// bytes, carry no value.
            pub fn is_unset(&self) -> bool {
                self.0.is_empty()
                    || self
                        .0
                        .windows(ID_LENGTH)
                        .any(|w| w.iter().all(|b| *b == 0))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl From<[u8; ID_LENGTH]> for $name {
            fn from(bytes: [u8; ID_LENGTH]) -> Self {
                Self(bytes.to_vec())
            }
        }
    };
}

opaque_id!(
    /// Identifier the broker assigns to a message.
    MessageId
);

opaque_id!(
    /// Identifier a requester matches replies against.
    CorrelId
);

impl CorrelId {
    /// The all-zero identifier meaning "no correlation requested".
    pub fn none() -> Self {
        Self(vec![0; ID_LENGTH])
    }
}

impl From<MessageId> for CorrelId {
    fn from(id: MessageId) -> Self {
        Self(id.0)
    }
}

/// Body format tag carried alongside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    None,
    /// Character data.
    String,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::None => "",
            Format::String => "MQSTR",
        }
    }
}

/// Metadata the transport attaches to a received message. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingEnvelope {
    pub message_id: MessageId,
    pub correlation_id: CorrelId,
    /// Name of the queue the requester expects the reply on.
    pub reply_to: String,
    pub format: Format,
}

/// Metadata attached to a reply. Built per reply and moved into a single send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEnvelope {
    pub message_id: MessageId,
    pub correlation_id: CorrelId,
    pub format: Format,
    pub destination: String,
}
