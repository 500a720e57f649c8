use serde::{Deserialize, Serialize};

/// The application payload exchanged between requester and responder.
///
/// Every field defaults to its zero value, so a request that omits fields (or
/// carries extra ones) still deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Record {
    pub greeting: String,
    pub message: String,
    pub value: i64,
    /// Application-level correlation, unrelated to the transport correlation id.
    #[serde(rename = "correlationID")]
    pub correlation_id: String,
}

impl Record {
    pub fn new(greeting: impl Into<String>, value: i64) -> Self {
        Self {
            greeting: greeting.into(),
            value,
            ..Self::default()
        }
    }
}
