//! Encoding and keyed publication of events.

use std::sync::Arc;

use broker::{Producer, ProducerRecord, RecordMetadata};
use common::topics::{HEADER_EVENT_TYPE, HEADER_SOURCE};
use events::RoutedEvent;
use tokio::sync::{Notify, RwLock};

use crate::error::PublishError;

/// Publishes [`RoutedEvent`]s on behalf of one service.
///
/// Every record is keyed by the event's order ID and tagged with its logical
/// type and the publishing service.
pub struct EventPublisher<P: Producer> {
    producer: Arc<P>,
    source: String,
}

impl<P: Producer> EventPublisher<P> {
    pub fn new(producer: Arc<P>, source: impl Into<String>) -> Self {
        Self {
            producer,
            source: source.into(),
        }
    }

    /// Returns true if both publishers send through the same producer handle.
    pub fn shares_producer(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.producer, &other.producer)
    }

    /// Name written to the `source` header.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Serializes an event into a keyed, tagged record.
    pub fn encode<E: RoutedEvent>(&self, event: &E) -> Result<ProducerRecord, serde_json::Error> {
        let payload = serde_json::to_vec(event)?;
        Ok(ProducerRecord::new(event.order_id().as_str(), payload)
            .header(HEADER_EVENT_TYPE, event.event_type())
            .header(HEADER_SOURCE, self.source.as_str()))
    }

    /// Sends an already encoded record.
    pub async fn send(
        &self,
        topic: &str,
        record: ProducerRecord,
    ) -> Result<RecordMetadata, broker::BrokerError> {
        self.producer.send(topic, record).await
    }

    /// Encodes and publishes an event to its topic.
    #[tracing::instrument(
        skip(self, event),
        fields(
            topic = event.topic(),
            event_type = event.event_type(),
            order_id = %event.order_id()
        )
    )]
    pub async fn publish<E: RoutedEvent>(&self, event: &E) -> Result<RecordMetadata, PublishError> {
        let record = self.encode(event)?;
        let metadata = self.send(event.topic(), record).await?;
        tracing::debug!(
            partition = metadata.partition,
            offset = metadata.offset,
            "event published"
        );
        Ok(metadata)
    }
}

impl<P: Producer> Clone for EventPublisher<P> {
    fn clone(&self) -> Self {
        Self {
            producer: Arc::clone(&self.producer),
            source: self.source.clone(),
        }
    }
}

/// Holds the publisher of a service while its producer is attached.
///
/// Request handlers read the slot; the service runner fills it after a
/// successful attach and empties it on shutdown. A handler whose publish
/// fails with a connectivity error reports it through
/// [`report_lost`](Self::report_lost), which empties the slot and wakes the
/// runner so it can reattach.
pub struct PublisherSlot<P: Producer> {
    inner: Arc<RwLock<Option<EventPublisher<P>>>>,
    lost: Arc<Notify>,
}

impl<P: Producer> PublisherSlot<P> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(None)),
            lost: Arc::new(Notify::new()),
        }
    }

    /// Returns the current publisher, if a producer is attached.
    pub async fn get(&self) -> Option<EventPublisher<P>> {
        self.inner.read().await.clone()
    }

    /// Replaces the current publisher.
    pub async fn set(&self, publisher: Option<EventPublisher<P>>) {
        *self.inner.write().await = publisher;
    }

    /// Empties the slot if it still holds `publisher`'s session and wakes
    /// [`lost`](Self::lost). Returns false if that session was already
    /// replaced or removed.
    pub async fn report_lost(&self, publisher: &EventPublisher<P>) -> bool {
        let mut current = self.inner.write().await;
        match current.as_ref() {
            Some(installed) if installed.shares_producer(publisher) => {
                *current = None;
                self.lost.notify_one();
                true
            }
            _ => false,
        }
    }

    /// Resolves once the installed session is reported lost.
    pub async fn lost(&self) {
        self.lost.notified().await;
    }
}

impl<P: Producer> Default for PublisherSlot<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Producer> Clone for PublisherSlot<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            lost: Arc::clone(&self.lost),
        }
    }
}
