use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// A record handed to [`Producer::send`](crate::Producer::send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerRecord {
    /// Partition key. Records sharing a key share a partition.
    pub key: String,

    /// Encoded payload.
    pub payload: Vec<u8>,

    /// Metadata headers (event type, source service).
    pub headers: BTreeMap<String, String>,
}

impl ProducerRecord {
    /// Creates a record with no headers.
    pub fn new(key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Where the broker stored an acknowledged record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
}

/// A message delivered to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub partition: u32,
    pub offset: u64,
    pub key: String,
    pub payload: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    /// When the broker appended the message.
    pub timestamp: DateTime<Utc>,
}

impl BrokerMessage {
    /// Returns the value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_record_builder_collects_headers() {
        let record = ProducerRecord::new("order-1", b"{}".to_vec())
            .header("event-type", "OrderCreated")
            .header("source", "order-service");

        assert_eq!(record.key, "order-1");
        assert_eq!(record.payload, b"{}");
        assert_eq!(record.headers.len(), 2);
        assert_eq!(record.headers["event-type"], "OrderCreated");
    }

    #[test]
    fn broker_message_header_lookup() {
        let message = BrokerMessage {
            topic: "payment-requests".to_string(),
            partition: 0,
            offset: 7,
            key: "order-1".to_string(),
            payload: Vec::new(),
            headers: BTreeMap::from([("source".to_string(), "order-service".to_string())]),
            timestamp: Utc::now(),
        };

        assert_eq!(message.header("source"), Some("order-service"));
        assert_eq!(message.header("event-type"), None);
    }
}
