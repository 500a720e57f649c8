use crate::domain::record::Record;
use chrono::{Local, SecondsFormat};

/// Computes the reply record for a decoded request.
pub trait ReplyTransform: Send + Sync {
    fn transform(&self, request: &Record) -> Record;
}

impl<F> ReplyTransform for F
where
    F: Fn(&Record) -> Record + Send + Sync,
{
    fn transform(&self, request: &Record) -> Record {
        self(request)
    }
}

/// Replies with the square of the request's value and a freshly stamped greeting.
#[derive(Debug, Clone)]
pub struct SquareValue {
    instance: String,
}

impl SquareValue {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }
}

impl ReplyTransform for SquareValue {
    fn transform(&self, request: &Record) -> Record {
        Record {
            greeting: format!(
                "Reply from {} is {}",
                self.instance,
                Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            value: request.value.wrapping_mul(request.value),
            ..Record::default()
        }
    }
}
