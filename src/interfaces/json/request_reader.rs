use crate::domain::envelope::CorrelId;
use crate::error::{ResponderError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::io::BufRead;

/// A request to place on the source queue before the responder starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRequest {
    pub payload: Vec<u8>,
    pub reply_to: Option<String>,
    pub correlation_id: Option<CorrelId>,
}

#[derive(Deserialize)]
struct RawRequest {
    body: Value,
    #[serde(default)]
    reply_to: Option<String>,
    #[serde(default)]
    correlation_id: Option<String>,
}

/// Reads seed requests from JSON lines.
///
/// Each non-blank line is an object with a `body` (a JSON string is sent as
/// raw text, anything else is sent as its JSON encoding), an optional
/// `reply_to` queue and an optional hex `correlation_id`.
pub struct RequestReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Lazily parses requests; a bad line yields an error and reading goes on.
    pub fn requests(self) -> impl Iterator<Item = Result<SeedRequest>> {
        self.source
            .lines()
            .enumerate()
            .filter(|(_, line)| !matches!(line, Ok(text) if text.trim().is_empty()))
            .map(|(index, line)| parse_line(index + 1, &line?))
    }
}

fn parse_line(line: usize, text: &str) -> Result<SeedRequest> {
    let invalid = |reason: String| ResponderError::InvalidRequest { line, reason };
    let raw: RawRequest = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;

    let payload = match raw.body {
        Value::String(text) => text.into_bytes(),
        other => serde_json::to_vec(&other)?,
    };
    let correlation_id = raw
        .correlation_id
        .map(|hex| CorrelId::from_hex(&hex))
        .transpose()
        .map_err(|e| invalid(format!("correlation_id: {e}")))?;

    Ok(SeedRequest {
        payload,
        reply_to: raw.reply_to.filter(|queue| !queue.trim().is_empty()),
        correlation_id,
    })
}
