use crate::domain::envelope::{
    CorrelId, Format, ID_LENGTH, IncomingEnvelope, MessageId, OutgoingEnvelope,
};
use crate::domain::ports::{
    ConnectionTarget, Delivery, OpenMode, QueueConnector, QueueHandle, QueueSelector,
    QueueTransport, QueueTransportBox, Received,
};
use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

const REASON_NOT_OPEN_FOR_INPUT: i32 = 2037;
const REASON_NOT_OPEN_FOR_OUTPUT: i32 = 2039;
const REASON_Q_MGR_NAME_ERROR: i32 = 2058;
const REASON_PUT_INHIBITED: i32 = 2051;

/// A message resting on an in-memory queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub payload: Vec<u8>,
    pub envelope: IncomingEnvelope,
    /// How many times the message was received and then rolled back.
    pub backout_count: u32,
}

/// Counts of resolved units of work.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncpointStats {
    pub commits: usize,
    pub rollbacks: usize,
    /// Messages returned to their queue by a rollback.
    pub backed_out: usize,
}

#[derive(Default)]
struct QueueManagerState {
    connected: bool,
    queues: HashMap<String, VecDeque<StoredMessage>>,
    handles: HashMap<u64, (String, OpenMode)>,
    next_handle: u64,
    sequence: u64,
    pending_gets: Vec<(String, StoredMessage)>,
    pending_puts: Vec<(String, StoredMessage)>,
    failing_opens: HashSet<String>,
    failing_sends: usize,
    failing_receives: VecDeque<TransportError>,
    stats: SyncpointStats,
}

impl QueueManagerState {
    fn handle(&self, handle: &QueueHandle) -> Result<&(String, OpenMode), TransportError> {
        if !self.connected {
            return Err(TransportError::ConnectionBroken);
        }
        self.handles
            .get(&handle.id)
            .ok_or(TransportError::InvalidHandle(handle.id))
    }
}

/// A broker connection that keeps every queue in process memory.
///
/// Honours syncpoint semantics: messages received under syncpoint are put back
/// at the head of their queue on rollback, and messages sent under syncpoint
/// stay invisible until commit. Clones share the same queues.
#[derive(Clone)]
pub struct InMemoryQueueManager {
    name: String,
    state: Arc<Mutex<QueueManagerState>>,
    arrivals: Arc<Notify>,
}

impl InMemoryQueueManager {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(QueueManagerState {
                connected: true,
                ..QueueManagerState::default()
            })),
            arrivals: Arc::new(Notify::new()),
        }
    }

    /// Creates an empty queue. Defining an existing queue keeps its messages.
    pub async fn define_queue(&self, name: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.queues.entry(name.into()).or_default();
    }

    pub async fn queue_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut names: Vec<String> = state.queues.keys().cloned().collect();
        names.sort();
        names
    }

    /// Committed depth of a queue, `None` if it is not defined.
    pub async fn depth(&self, queue: &str) -> Option<usize> {
        let state = self.state.lock().await;
        state.queues.get(queue).map(VecDeque::len)
    }

    /// Copies of the committed messages on a queue, oldest first.
    pub async fn browse(&self, queue: &str) -> Vec<StoredMessage> {
        let state = self.state.lock().await;
        state
            .queues
            .get(queue)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn stats(&self) -> SyncpointStats {
        self.state.lock().await.stats
    }

    /// Puts a request outside of any unit of work and returns its message id.
    pub async fn put_request(
        &self,
        queue: &str,
        payload: Vec<u8>,
        reply_to: &str,
        correlation_id: Option<CorrelId>,
    ) -> Result<MessageId, TransportError> {
        let mut state = self.state.lock().await;
        if !state.queues.contains_key(queue) {
            return Err(TransportError::UnknownQueue(queue.to_string()));
        }
        let message_id = self.next_message_id(&mut state);
        let message = StoredMessage {
            payload,
            envelope: IncomingEnvelope {
                message_id: message_id.clone(),
                correlation_id: correlation_id.unwrap_or_else(CorrelId::none),
                reply_to: reply_to.to_string(),
                format: Format::String,
            },
            backout_count: 0,
        };
        state.queues.entry(queue.to_string()).or_default().push_back(message);
        drop(state);
        self.arrivals.notify_waiters();
        Ok(message_id)
    }

    /// Makes every later open of `queue` fail, even though it is defined.
    pub async fn fail_opens_of(&self, queue: impl Into<String>) {
        self.state.lock().await.failing_opens.insert(queue.into());
    }

    /// Makes the next `count` sends fail.
    pub async fn fail_next_sends(&self, count: usize) {
        self.state.lock().await.failing_sends = count;
    }

    /// Queues an error for the next receive to report.
    pub async fn fail_next_receive(&self, error: TransportError) {
        self.state.lock().await.failing_receives.push_back(error);
    }

    /// Drops the connection. Every later operation reports a broken connection.
    pub async fn disconnect(&self) {
        self.state.lock().await.connected = false;
    }

    /// Broker-style ids: "AMQ ", the queue manager name padded to 12 bytes,
    /// then a big-endian sequence number.
    fn next_message_id(&self, state: &mut QueueManagerState) -> MessageId {
        state.sequence += 1;
        let mut id = [b' '; ID_LENGTH];
        id[..4].copy_from_slice(b"AMQ ");
        let name = self.name.as_bytes();
        let len = name.len().min(12);
        id[4..4 + len].copy_from_slice(&name[..len]);
        id[16..].copy_from_slice(&state.sequence.to_be_bytes());
        MessageId::from(id)
    }

    fn try_take(
        state: &mut QueueManagerState,
        handle: &QueueHandle,
        delivery: Delivery,
    ) -> Result<Option<StoredMessage>, TransportError> {
        let (queue, mode) = state.handle(handle)?.clone();
        if mode != OpenMode::Input {
            return Err(TransportError::Broker {
                reason: REASON_NOT_OPEN_FOR_INPUT,
                message: format!("queue '{queue}' is not open for input"),
            });
        }
        if let Some(error) = state.failing_receives.pop_front() {
            return Err(error);
        }
        let Some(message) = state.queues.get_mut(&queue).and_then(VecDeque::pop_front) else {
            return Ok(None);
        };
        if delivery == Delivery::Syncpoint {
            state.pending_gets.push((queue, message.clone()));
        }
        Ok(Some(message))
    }
}

#[async_trait]
impl QueueTransport for InMemoryQueueManager {
    async fn open(&self, selector: &QueueSelector) -> Result<QueueHandle, TransportError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(TransportError::ConnectionBroken);
        }
        if state.failing_opens.contains(&selector.name)
            || !state.queues.contains_key(&selector.name)
        {
            return Err(TransportError::UnknownQueue(selector.name.clone()));
        }
        state.next_handle += 1;
        let id = state.next_handle;
        state
            .handles
            .insert(id, (selector.name.clone(), selector.mode));
        tracing::debug!(queue = %selector.name, handle = id, "opened queue");
        Ok(QueueHandle {
            id,
            name: selector.name.clone(),
            mode: selector.mode,
        })
    }

    async fn receive(
        &self,
        handle: &QueueHandle,
        wait: Duration,
        delivery: Delivery,
    ) -> Result<Received, TransportError> {
        let deadline = Instant::now() + wait;
        loop {
            let arrival = self.arrivals.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(message) = Self::try_take(&mut state, handle, delivery)? {
                    return Ok(Received {
                        payload: message.payload,
                        envelope: message.envelope,
                    });
                }
            }

            if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                return Err(TransportError::NoMessageAvailable);
            }
        }
    }

    async fn send(
        &self,
        handle: &QueueHandle,
        payload: &[u8],
        envelope: OutgoingEnvelope,
        delivery: Delivery,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let (queue, mode) = state.handle(handle)?.clone();
        if mode != OpenMode::Output {
            return Err(TransportError::Broker {
                reason: REASON_NOT_OPEN_FOR_OUTPUT,
                message: format!("queue '{queue}' is not open for output"),
            });
        }
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(TransportError::Broker {
                reason: REASON_PUT_INHIBITED,
                message: format!("put to '{queue}' inhibited"),
            });
        }

        let message_id = if envelope.message_id.is_unset() {
            self.next_message_id(&mut state)
        } else {
            envelope.message_id
        };
        let message = StoredMessage {
            payload: payload.to_vec(),
            envelope: IncomingEnvelope {
                message_id,
                correlation_id: envelope.correlation_id,
                reply_to: String::new(),
                format: envelope.format,
            },
            backout_count: 0,
        };

        match delivery {
            Delivery::Syncpoint => state.pending_puts.push((queue, message)),
            Delivery::Immediate => {
                state.queues.entry(queue).or_default().push_back(message);
                drop(state);
                self.arrivals.notify_waiters();
            }
        }
        Ok(())
    }

    async fn commit(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(TransportError::ConnectionBroken);
        }
        state.pending_gets.clear();
        let puts = std::mem::take(&mut state.pending_puts);
        for (queue, message) in puts {
            state.queues.entry(queue).or_default().push_back(message);
        }
        state.stats.commits += 1;
        drop(state);
        self.arrivals.notify_waiters();
        Ok(())
    }

    async fn rollback(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if !state.connected {
            return Err(TransportError::ConnectionBroken);
        }
        state.pending_puts.clear();
        let gets = std::mem::take(&mut state.pending_gets);
        state.stats.backed_out += gets.len();
        for (queue, mut message) in gets.into_iter().rev() {
            message.backout_count += 1;
            state.queues.entry(queue).or_default().push_front(message);
        }
        state.stats.rollbacks += 1;
        drop(state);
        self.arrivals.notify_waiters();
        Ok(())
    }

    async fn close(&self, handle: QueueHandle) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        state
            .handles
            .remove(&handle.id)
            .map(|_| ())
            .ok_or(TransportError::InvalidHandle(handle.id))
    }
}

/// Hands out connections to a single in-memory queue manager.
#[derive(Clone)]
pub struct InMemoryConnector {
    queue_manager: InMemoryQueueManager,
}

impl InMemoryConnector {
    pub fn new(queue_manager: InMemoryQueueManager) -> Self {
        Self { queue_manager }
    }
}

#[async_trait]
impl QueueConnector for InMemoryConnector {
    async fn connect(
        &self,
        target: &ConnectionTarget,
    ) -> Result<QueueTransportBox, TransportError> {
        if !target.queue_manager.is_empty() && target.queue_manager != self.queue_manager.name {
            return Err(TransportError::Broker {
                reason: REASON_Q_MGR_NAME_ERROR,
                message: format!("unknown queue manager '{}'", target.queue_manager),
            });
        }
        Ok(Box::new(self.queue_manager.clone()))
    }
}
