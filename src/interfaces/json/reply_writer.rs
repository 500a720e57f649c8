use crate::error::Result;
use crate::infrastructure::in_memory::StoredMessage;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;

#[derive(Serialize)]
struct ReplyLine<'a> {
    queue: &'a str,
    message_id: String,
    correlation_id: String,
    body: Value,
}

/// Writes delivered replies as JSON lines.
pub struct ReplyWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReplyWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one line per reply. Bodies that are not JSON are written as strings.
    pub fn write_replies<'a>(
        &mut self,
        queue: &str,
        replies: impl IntoIterator<Item = &'a StoredMessage>,
    ) -> Result<()> {
        for reply in replies {
            let body = serde_json::from_slice(&reply.payload).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&reply.payload).into_owned())
            });
            let line = ReplyLine {
                queue,
                message_id: reply.envelope.message_id.to_hex(),
                correlation_id: reply.envelope.correlation_id.to_hex(),
                body,
            };
            serde_json::to_writer(&mut self.writer, &line)?;
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
