use super::envelope::OutgoingEnvelope;
use super::ports::{Delivery, QueueHandle, QueueTransport, Received};
use crate::error::TransportError;
use std::time::Duration;

/// A unit of work on a transport connection.
///
/// Everything received or sent through a `Syncpoint` becomes durable together
/// on [`Syncpoint::commit`] or is undone together on [`Syncpoint::rollback`].
/// Both consume the value, so a unit of work is resolved exactly once.
#[must_use = "a syncpoint must be committed or rolled back"]
pub struct Syncpoint<'t> {
    transport: &'t dyn QueueTransport,
    resolved: bool,
}

impl<'t> Syncpoint<'t> {
    pub fn begin(transport: &'t dyn QueueTransport) -> Self {
        Self {
            transport,
            resolved: false,
        }
    }

    pub async fn receive(
        &self,
        handle: &QueueHandle,
        wait: Duration,
    ) -> Result<Received, TransportError> {
        self.transport
            .receive(handle, wait, Delivery::Syncpoint)
            .await
    }

    pub async fn send(
        &self,
        handle: &QueueHandle,
        payload: &[u8],
        envelope: OutgoingEnvelope,
    ) -> Result<(), TransportError> {
        self.transport
            .send(handle, payload, envelope, Delivery::Syncpoint)
            .await
    }

    pub async fn commit(mut self) -> Result<(), TransportError> {
        self.resolved = true;
        self.transport.commit().await
    }

    pub async fn rollback(mut self) -> Result<(), TransportError> {
        self.resolved = true;
        self.transport.rollback().await
    }
}

impl Drop for Syncpoint<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::warn!("syncpoint dropped without commit or rollback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{Format, MessageId};
    use crate::domain::ports::QueueSelector;
    use crate::infrastructure::in_memory::InMemoryQueueManager;

    const WAIT: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_commit_makes_receive_durable() {
        let qmgr = InMemoryQueueManager::new("QM1");
        qmgr.define_queue("REQ").await;
        qmgr.put_request("REQ", b"one".to_vec(), "REPLY", None).await.unwrap();

        let handle = qmgr.open(&QueueSelector::input("REQ")).await.unwrap();
        let syncpoint = Syncpoint::begin(&qmgr);
        let received = syncpoint.receive(&handle, WAIT).await.unwrap();
        assert_eq!(received.payload, b"one");
        syncpoint.commit().await.unwrap();

        assert_eq!(qmgr.depth("REQ").await, Some(0));
        assert_eq!(qmgr.stats().await.commits, 1);
    }

    #[tokio::test]
    async fn test_rollback_undoes_receive_and_send() {
        let qmgr = InMemoryQueueManager::new("QM1");
        qmgr.define_queue("REQ").await;
        qmgr.define_queue("REPLY").await;
        qmgr.put_request("REQ", b"one".to_vec(), "REPLY", None).await.unwrap();

        let input = qmgr.open(&QueueSelector::input("REQ")).await.unwrap();
        let output = qmgr.open(&QueueSelector::output("REPLY")).await.unwrap();
        let syncpoint = Syncpoint::begin(&qmgr);
        syncpoint.receive(&input, WAIT).await.unwrap();
        let envelope = OutgoingEnvelope {
            message_id: MessageId::new(vec![1; 24]),
            correlation_id: Default::default(),
            format: Format::String,
            destination: "REPLY".into(),
        };
        syncpoint.send(&output, b"reply", envelope).await.unwrap();
        syncpoint.rollback().await.unwrap();

        assert_eq!(qmgr.depth("REQ").await, Some(1));
        assert_eq!(qmgr.depth("REPLY").await, Some(0));
        let stats = qmgr.stats().await;
        assert_eq!(stats.rollbacks, 1);
        assert_eq!(stats.commits, 0);
    }
}
