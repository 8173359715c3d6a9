use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::{
    Broker, BrokerError, BrokerMessage, Consumer, Producer, ProducerRecord, RecordMetadata, Result,
};

/// Partition count used by [`InMemoryBroker::new`].
pub const DEFAULT_PARTITIONS: u32 = 3;

type PartitionLog = Vec<BrokerMessage>;

/// Committed offsets and live members of one consumer group on one topic.
struct GroupCursor {
    offsets: Vec<u64>,
    members: Vec<u64>,
}

impl GroupCursor {
    /// Partitions are dealt round-robin over members in join order.
    fn owner(&self, partition: u32) -> Option<u64> {
        if self.members.is_empty() {
            None
        } else {
            Some(self.members[partition as usize % self.members.len()])
        }
    }
}

struct BrokerState {
    available: bool,
    topics: HashMap<String, Vec<PartitionLog>>,
    groups: HashMap<(String, String), GroupCursor>,
    next_member_id: u64,
}

impl BrokerState {
    fn topic_mut(&mut self, topic: &str, partitions: u32) -> &mut Vec<PartitionLog> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| (0..partitions).map(|_| Vec::new()).collect())
    }
}

struct Shared {
    state: Mutex<BrokerState>,
    notify: Notify,
    partitions: u32,
}

impl Shared {
    // The lock is never held across an await, and every critical section
    // leaves the state consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn partition_for(key: &str, partitions: u32) -> u32 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % u64::from(partitions)) as u32
}

fn ensure_valid_topic(topic: &str) -> Result<()> {
    if topic.trim().is_empty() {
        return Err(BrokerError::InvalidTopic(topic.to_string()));
    }
    Ok(())
}

/// In-process broker with the delivery contract of a partitioned log.
///
/// - Topics are created on first use with a fixed number of partitions.
/// - A record's partition is a stable hash of its key.
/// - Each consumer group tracks one committed offset per partition; a
///   partition is read by exactly one live member of the group at a time.
/// - [`set_available`](Self::set_available) simulates an outage for
///   connection-retry tests.
#[derive(Clone)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    /// Creates a broker with [`DEFAULT_PARTITIONS`] partitions per topic.
    pub fn new() -> Self {
        Self::with_partitions(DEFAULT_PARTITIONS)
    }

    /// Creates a broker with the given number of partitions per topic (at least 1).
    pub fn with_partitions(partitions: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState {
                    available: true,
                    topics: HashMap::new(),
                    groups: HashMap::new(),
                    next_member_id: 0,
                }),
                notify: Notify::new(),
                partitions: partitions.max(1),
            }),
        }
    }

    /// Returns the number of partitions per topic.
    pub fn partitions(&self) -> u32 {
        self.shared.partitions
    }

    /// Returns the partition a key routes to.
    pub fn partition_for(&self, key: &str) -> u32 {
        partition_for(key, self.shared.partitions)
    }

    /// Makes the broker reachable or unreachable.
    ///
    /// While unreachable, connects and sends fail and every waiting consumer
    /// is woken with [`BrokerError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.shared.lock().available = available;
        self.shared.notify.notify_waiters();
        tracing::info!(available, "in-memory broker availability changed");
    }

    /// Returns true if the broker is currently reachable.
    pub fn is_available(&self) -> bool {
        self.shared.lock().available
    }

    /// Returns every message published to `topic`, partition by partition,
    /// each partition in offset order.
    pub fn messages(&self, topic: &str) -> Vec<BrokerMessage> {
        self.shared
            .lock()
            .topics
            .get(topic)
            .map(|partitions| partitions.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of messages published to `topic`.
    pub fn message_count(&self, topic: &str) -> usize {
        self.shared
            .lock()
            .topics
            .get(topic)
            .map(|partitions| partitions.iter().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Returns the number of live members of `group_id` subscribed to `topic`.
    pub fn member_count(&self, group_id: &str, topic: &str) -> usize {
        self.shared
            .lock()
            .groups
            .get(&(group_id.to_string(), topic.to_string()))
            .map(|cursor| cursor.members.len())
            .unwrap_or(0)
    }

    fn ensure_available(&self, what: &str) -> Result<()> {
        if self.shared.lock().available {
            Ok(())
        } else {
            Err(BrokerError::Unavailable(format!(
                "cannot connect {what}: broker unreachable"
            )))
        }
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    type Producer = InMemoryProducer;
    type Consumer = InMemoryConsumer;

    async fn connect_producer(&self, client_id: &str) -> Result<InMemoryProducer> {
        self.ensure_available(&format!("producer '{client_id}'"))?;
        tracing::debug!(client_id, "producer connected");
        Ok(InMemoryProducer {
            shared: Arc::clone(&self.shared),
            client_id: client_id.to_string(),
            connected: AtomicBool::new(true),
        })
    }

    async fn connect_consumer(&self, client_id: &str, group_id: &str) -> Result<InMemoryConsumer> {
        let member_id = {
            let mut state = self.shared.lock();
            if !state.available {
                return Err(BrokerError::Unavailable(format!(
                    "cannot connect consumer '{client_id}': broker unreachable"
                )));
            }
            state.next_member_id += 1;
            state.next_member_id
        };
        tracing::debug!(client_id, group_id, member_id, "consumer connected");
        Ok(InMemoryConsumer {
            shared: Arc::clone(&self.shared),
            client_id: client_id.to_string(),
            group_id: group_id.to_string(),
            member_id,
            topics: Vec::new(),
            connected: true,
            next_slot: 0,
        })
    }
}

/// Producer session on an [`InMemoryBroker`].
pub struct InMemoryProducer {
    shared: Arc<Shared>,
    client_id: String,
    connected: AtomicBool,
}

#[async_trait]
impl Producer for InMemoryProducer {
    async fn send(&self, topic: &str, record: ProducerRecord) -> Result<RecordMetadata> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(BrokerError::NotConnected(self.client_id.clone()));
        }
        ensure_valid_topic(topic)?;

        let metadata = {
            let mut state = self.shared.lock();
            if !state.available {
                return Err(BrokerError::Unavailable(format!(
                    "send to '{topic}' failed: broker unreachable"
                )));
            }
            let partition = partition_for(&record.key, self.shared.partitions);
            let log = &mut state.topic_mut(topic, self.shared.partitions)[partition as usize];
            let offset = log.len() as u64;
            log.push(BrokerMessage {
                topic: topic.to_string(),
                partition,
                offset,
                key: record.key,
                payload: record.payload,
                headers: record.headers,
                timestamp: Utc::now(),
            });
            RecordMetadata {
                topic: topic.to_string(),
                partition,
                offset,
            }
        };

        self.shared.notify.notify_waiters();
        metrics::counter!("broker_messages_published_total", "topic" => topic.to_string())
            .increment(1);
        Ok(metadata)
    }

    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            tracing::debug!(client_id = %self.client_id, "producer disconnected");
        }
        Ok(())
    }
}

/// Consumer session on an [`InMemoryBroker`].
///
/// Dropping the consumer leaves its group, like an expired session would.
pub struct InMemoryConsumer {
    shared: Arc<Shared>,
    client_id: String,
    group_id: String,
    member_id: u64,
    topics: Vec<String>,
    connected: bool,
    next_slot: usize,
}

impl InMemoryConsumer {
    /// Takes the next message from any assigned partition, committing its
    /// offset. Partitions are scanned round-robin so one busy partition
    /// cannot starve the others.
    fn try_fetch(&mut self) -> Result<Option<BrokerMessage>> {
        let mut state = self.shared.lock();
        if !state.available {
            return Err(BrokerError::Unavailable(format!(
                "session for consumer '{}' lost",
                self.client_id
            )));
        }

        let partitions = self.shared.partitions as usize;
        let slots = self.topics.len() * partitions;
        for step in 0..slots {
            let slot = (self.next_slot + step) % slots;
            let partition = slot % partitions;
            let key = (self.group_id.clone(), self.topics[slot / partitions].clone());

            let Some(cursor) = state.groups.get(&key) else {
                continue;
            };
            if cursor.owner(partition as u32) != Some(self.member_id) {
                continue;
            }
            let offset = cursor.offsets[partition] as usize;
            let Some(message) = state
                .topics
                .get(&key.1)
                .and_then(|log| log[partition].get(offset))
                .cloned()
            else {
                continue;
            };

            if let Some(cursor) = state.groups.get_mut(&key) {
                cursor.offsets[partition] += 1;
            }
            self.next_slot = (slot + 1) % slots;
            return Ok(Some(message));
        }
        Ok(None)
    }

    fn leave_group(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        {
            let mut state = self.shared.lock();
            for topic in &self.topics {
                if let Some(cursor) = state
                    .groups
                    .get_mut(&(self.group_id.clone(), topic.clone()))
                {
                    cursor.members.retain(|m| *m != self.member_id);
                }
            }
        }
        // remaining members may have inherited partitions with pending messages
        self.shared.notify.notify_waiters();
        tracing::debug!(
            client_id = %self.client_id,
            group_id = %self.group_id,
            "consumer left group"
        );
    }
}

#[async_trait]
impl Consumer for InMemoryConsumer {
    async fn subscribe(&mut self, topic: &str, from_beginning: bool) -> Result<()> {
        if !self.connected {
            return Err(BrokerError::NotConnected(self.client_id.clone()));
        }
        ensure_valid_topic(topic)?;

        {
            let mut state = self.shared.lock();
            if !state.available {
                return Err(BrokerError::Unavailable(format!(
                    "subscribe to '{topic}' failed: broker unreachable"
                )));
            }
            let ends: Vec<u64> = state
                .topic_mut(topic, self.shared.partitions)
                .iter()
                .map(|log| log.len() as u64)
                .collect();
            let cursor = state
                .groups
                .entry((self.group_id.clone(), topic.to_string()))
                .or_insert_with(|| GroupCursor {
                    offsets: if from_beginning {
                        vec![0; ends.len()]
                    } else {
                        ends
                    },
                    members: Vec::new(),
                });
            if !cursor.members.contains(&self.member_id) {
                cursor.members.push(self.member_id);
            }
        }

        if !self.topics.iter().any(|t| t == topic) {
            self.topics.push(topic.to_string());
        }
        self.shared.notify.notify_waiters();
        tracing::debug!(
            client_id = %self.client_id,
            group_id = %self.group_id,
            topic,
            from_beginning,
            "consumer subscribed"
        );
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<BrokerMessage>> {
        let shared = Arc::clone(&self.shared);
        loop {
            // Register interest before checking so a publish between the
            // check and the await is not missed.
            let notified = shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.connected {
                return Ok(None);
            }
            if self.topics.is_empty() {
                return Err(BrokerError::NotSubscribed(self.client_id.clone()));
            }
            if let Some(message) = self.try_fetch()? {
                return Ok(Some(message));
            }
            notified.await;
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.leave_group();
        Ok(())
    }
}

impl Drop for InMemoryConsumer {
    fn drop(&mut self) {
        self.leave_group();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, body: &str) -> ProducerRecord {
        ProducerRecord::new(key, body.as_bytes().to_vec())
    }

    #[test]
    fn partition_for_is_stable_and_in_range() {
        let broker = InMemoryBroker::with_partitions(4);
        for key in ["a", "order-1", "order-2", "some-longer-key"] {
            let p = broker.partition_for(key);
            assert!(p < 4);
            assert_eq!(p, broker.partition_for(key));
        }
    }

    #[test]
    fn zero_partitions_is_clamped_to_one() {
        let broker = InMemoryBroker::with_partitions(0);
        assert_eq!(broker.partitions(), 1);
        assert_eq!(broker.partition_for("anything"), 0);
    }

    #[tokio::test]
    async fn send_assigns_sequential_offsets_per_partition() {
        let broker = InMemoryBroker::new();
        let producer = broker.connect_producer("p").await.unwrap();

        let m1 = producer.send("t", record("k", "1")).await.unwrap();
        let m2 = producer.send("t", record("k", "2")).await.unwrap();

        assert_eq!(m1.partition, m2.partition);
        assert_eq!(m1.offset, 0);
        assert_eq!(m2.offset, 1);
        assert_eq!(broker.message_count("t"), 2);
    }

    #[tokio::test]
    async fn send_rejects_blank_topic() {
        let broker = InMemoryBroker::new();
        let producer = broker.connect_producer("p").await.unwrap();

        let err = producer.send(" ", record("k", "1")).await.unwrap_err();
        assert!(matches!(err, BrokerError::InvalidTopic(_)));
    }

    #[tokio::test]
    async fn send_after_disconnect_fails() {
        let broker = InMemoryBroker::new();
        let producer = broker.connect_producer("p").await.unwrap();
        producer.disconnect().await.unwrap();

        let err = producer.send("t", record("k", "1")).await.unwrap_err();
        assert!(matches!(err, BrokerError::NotConnected(_)));
        assert!(err.is_connectivity());
    }

    #[tokio::test]
    async fn fetch_without_subscription_fails() {
        let broker = InMemoryBroker::new();
        let mut consumer = broker.connect_consumer("c", "g").await.unwrap();

        let err = consumer.next_message().await.unwrap_err();
        assert!(matches!(err, BrokerError::NotSubscribed(_)));
    }

    #[tokio::test]
    async fn dropping_consumer_leaves_group() {
        let broker = InMemoryBroker::new();
        let mut consumer = broker.connect_consumer("c", "g").await.unwrap();
        consumer.subscribe("t", false).await.unwrap();
        assert_eq!(broker.member_count("g", "t"), 1);

        drop(consumer);
        assert_eq!(broker.member_count("g", "t"), 0);
    }
}
