//! Message source contract.
//!
//! Every message comes with its stream position and a handle that commits
//! exactly that position. Nothing is committed implicitly: the consumer calls
//! [`InboundMessage::commit`] when it is done with the message.

use async_trait::async_trait;
use orderflow_core::{OrderflowResult, SourceError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque position of a message in the stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl StreamPosition {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for StreamPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.topic, self.partition, self.offset)
    }
}

/// Commits a stream position back to the broker.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn commit(&self, position: &StreamPosition) -> OrderflowResult<()>;
}

/// A message pulled from a [`MessageSource`].
pub struct InboundMessage {
    payload: Vec<u8>,
    position: StreamPosition,
    ack: Arc<dyn Acknowledge>,
}

impl InboundMessage {
    pub fn new(payload: Vec<u8>, position: StreamPosition, ack: Arc<dyn Acknowledge>) -> Self {
        Self {
            payload,
            position,
            ack,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn position(&self) -> &StreamPosition {
        &self.position
    }

    /// Commit this message's position. Consumes the message.
    pub async fn commit(self) -> OrderflowResult<()> {
        self.ack.commit(&self.position).await
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("position", &self.position)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Ordered, at-least-once stream of raw payloads with manual commit.
#[async_trait]
pub trait MessageSource: Send {
    /// Next message. `Ok(None)` once the stream is closed for good.
    async fn recv(&mut self) -> OrderflowResult<Option<InboundMessage>>;
}

// ============================================================================
// IN-MEMORY SOURCE
// ============================================================================

/// Positions committed through a [`MemorySource`], in commit order.
#[derive(Debug, Clone, Default)]
pub struct CommitLog {
    committed: Arc<Mutex<Vec<StreamPosition>>>,
    failing: Arc<AtomicBool>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> Vec<StreamPosition> {
        self.committed.lock().clone()
    }

    pub fn offsets(&self) -> Vec<i64> {
        self.committed.lock().iter().map(|p| p.offset).collect()
    }

    /// Make every commit fail until switched back.
    pub fn fail_commits(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Acknowledge for CommitLog {
    async fn commit(&self, position: &StreamPosition) -> OrderflowResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SourceError::CommitFailed {
                position: position.to_string(),
                reason: "commit rejected".to_string(),
            }
            .into());
        }
        self.committed.lock().push(position.clone());
        Ok(())
    }
}

type Delivery = Result<Vec<u8>, SourceError>;

/// Producer half of a [`MemorySource`].
#[derive(Debug, Clone)]
pub struct MemorySender {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl MemorySender {
    /// Queue a payload. Returns false once the source is gone.
    pub fn send(&self, payload: impl Into<Vec<u8>>) -> bool {
        self.tx.send(Ok(payload.into())).is_ok()
    }

    /// Queue a receive failure.
    pub fn send_error(&self, error: SourceError) -> bool {
        self.tx.send(Err(error)).is_ok()
    }
}

/// Single-partition in-memory stream.
///
/// Offsets start at zero and grow by one per payload. The stream closes when
/// every [`MemorySender`] is dropped and the queue is drained.
#[derive(Debug)]
pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Delivery>,
    topic: String,
    partition: i32,
    next_offset: i64,
    log: CommitLog,
}

impl MemorySource {
    /// Open an empty stream and its sender.
    pub fn channel(topic: impl Into<String>) -> (MemorySender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let source = Self {
            rx,
            topic: topic.into(),
            partition: 0,
            next_offset: 0,
            log: CommitLog::new(),
        };
        (MemorySender { tx }, source)
    }

    /// A closed stream holding exactly `payloads`.
    pub fn from_payloads<I, P>(topic: impl Into<String>, payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        let (sender, source) = Self::channel(topic);
        for payload in payloads {
            sender.send(payload);
        }
        source
    }

    /// Handle on the positions committed so far.
    pub fn commit_log(&self) -> CommitLog {
        self.log.clone()
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn recv(&mut self) -> OrderflowResult<Option<InboundMessage>> {
        match self.rx.recv().await {
            None => Ok(None),
            Some(Err(error)) => Err(error.into()),
            Some(Ok(payload)) => {
                let position =
                    StreamPosition::new(self.topic.clone(), self.partition, self.next_offset);
                self.next_offset += 1;
                let ack: Arc<dyn Acknowledge> = Arc::new(self.log.clone());
                Ok(Some(InboundMessage::new(payload, position, ack)))
            }
        }
    }
}
