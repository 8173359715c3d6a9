use async_trait::async_trait;

use crate::{BrokerMessage, ProducerRecord, RecordMetadata, Result};

/// Entry point to a broker: hands out producer and consumer sessions.
///
/// Connecting is the only operation that can fail because the broker is
/// unreachable; callers are expected to retry it.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Producer session type.
    type Producer: Producer;
    /// Consumer session type.
    type Consumer: Consumer;

    /// Opens a producer session identified by `client_id`.
    async fn connect_producer(&self, client_id: &str) -> Result<Self::Producer>;

    /// Opens a consumer session that joins the consumer group `group_id`.
    async fn connect_consumer(&self, client_id: &str, group_id: &str) -> Result<Self::Consumer>;
}

/// A producer session.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    /// Publishes a record to `topic` and waits for the broker acknowledgment.
    ///
    /// The record key decides the partition, so records with equal keys are
    /// delivered in the order they were sent.
    async fn send(&self, topic: &str, record: ProducerRecord) -> Result<RecordMetadata>;

    /// Releases the session. Later sends fail with `NotConnected`.
    async fn disconnect(&self) -> Result<()>;
}

/// A consumer session belonging to a consumer group.
#[async_trait]
pub trait Consumer: Send + 'static {
    /// Subscribes to `topic`.
    ///
    /// With `from_beginning = false` a group that has never read the topic
    /// starts at the current end of every partition, so history is not
    /// replayed. A group with committed offsets always resumes from them.
    async fn subscribe(&mut self, topic: &str, from_beginning: bool) -> Result<()>;

    /// Waits for the next message on an assigned partition.
    ///
    /// Returns `Ok(None)` once the consumer has been disconnected and
    /// `Err(BrokerError::Unavailable)` if the session is lost.
    async fn next_message(&mut self) -> Result<Option<BrokerMessage>>;

    /// Leaves the consumer group and releases the session.
    async fn disconnect(&mut self) -> Result<()>;
}
