use super::envelope::{CorrelId, Format, IncomingEnvelope, OutgoingEnvelope};

/// Picks the correlation id a reply must carry.
///
/// A request without a correlation id is answered on its own message id,
/// otherwise the requester's correlation id is echoed unchanged.
pub fn derive_outgoing_correlation(incoming: &IncomingEnvelope) -> CorrelId {
    if incoming.correlation_id.is_unset() {
        CorrelId::from(incoming.message_id.clone())
    } else {
        incoming.correlation_id.clone()
    }
}

/// Builds the envelope for the reply to `incoming`.
pub fn build_outgoing_envelope(incoming: &IncomingEnvelope) -> OutgoingEnvelope {
    OutgoingEnvelope {
        message_id: incoming.message_id.clone(),
        correlation_id: derive_outgoing_correlation(incoming),
        format: Format::String,
        destination: incoming.reply_to.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{ID_LENGTH, MessageId};

    fn envelope(correlation_id: CorrelId) -> IncomingEnvelope {
        IncomingEnvelope {
            message_id: MessageId::from(*b"AMQ QM1         \x00\x00\x00\x00\x00\x00\x00\x2a"),
            correlation_id,
            reply_to: "DEV.QUEUE.2".into(),
            format: Format::String,
        }
    }

    #[test]
    fn test_zero_correlation_uses_message_id() {
        let incoming = envelope(CorrelId::from([0u8; ID_LENGTH]));
        let outgoing = derive_outgoing_correlation(&incoming);
        assert_eq!(outgoing.as_bytes(), incoming.message_id.as_bytes());
    }

    #[test]
    fn test_empty_correlation_uses_message_id() {
        let incoming = envelope(CorrelId::default());
        let outgoing = derive_outgoing_correlation(&incoming);
        assert_eq!(outgoing.as_bytes(), incoming.message_id.as_bytes());
    }

    #[test]
    fn test_short_zero_correlation_is_echoed() {
        let incoming = envelope(CorrelId::new(vec![0u8; 5]));
        assert_eq!(
            derive_outgoing_correlation(&incoming),
            CorrelId::new(vec![0u8; 5])
        );
    }

    #[test]
    fn test_explicit_correlation_is_echoed() {
        let mut bytes = [0u8; ID_LENGTH];
        bytes[..4].copy_from_slice(b"REQ1");
        let incoming = envelope(CorrelId::from(bytes));
        assert_eq!(derive_outgoing_correlation(&incoming), CorrelId::from(bytes));
    }

    #[test]
    fn test_outgoing_envelope() {
        let incoming = envelope(CorrelId::none());
        let outgoing = build_outgoing_envelope(&incoming);
        assert_eq!(outgoing.message_id, incoming.message_id);
        assert_eq!(outgoing.format, Format::String);
        assert_eq!(outgoing.destination, "DEV.QUEUE.2");
        assert_eq!(outgoing.correlation_id.as_bytes(), incoming.message_id.as_bytes());
    }
}
