//! UTF-8 JSON codec for [`Record`] payloads.
//!
//! Decoding is permissive: a request that is not valid JSON, or whose fields
//! have the wrong types, still yields a record. Whatever could be recovered is
//! kept, the rest falls back to zero values, and the problem is reported as a
//! [`DecodeWarning`] for the caller to log.

use crate::domain::record::Record;
use crate::error::EncodeError;
use serde_json::{Map, Value};
use thiserror::Error;

/// The payload did not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("payload is not a well-formed request: {0}")]
pub struct DecodeWarning(pub String);

/// Result of decoding a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub record: Record,
    pub warning: Option<DecodeWarning>,
}

pub fn decode(bytes: &[u8]) -> Decoded {
    match serde_json::from_slice::<Record>(bytes) {
        Ok(record) => Decoded {
            record,
            warning: None,
        },
        Err(strict) => {
            let record = match serde_json::from_slice::<Value>(bytes) {
                Ok(Value::Object(fields)) => salvage(&fields),
                _ => Record::default(),
            };
            Decoded {
                record,
                warning: Some(DecodeWarning(strict.to_string())),
            }
        }
    }
}

pub fn encode(record: &Record) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(record)?)
}

fn salvage(fields: &Map<String, Value>) -> Record {
    let text = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    };
    Record {
        greeting: text("greeting"),
        message: text("message"),
        value: fields
            .get("value")
            .and_then(Value::as_i64)
            .unwrap_or_default(),
        correlation_id: text("correlationID"),
    }
}
