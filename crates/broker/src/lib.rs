//! Broker abstraction for the order choreography.
//!
//! Services talk to each other only through a partitioned, ordered
//! publish/subscribe broker. This crate defines the narrow client surface the
//! services rely on ([`Broker`], [`Producer`], [`Consumer`]) and ships an
//! [`InMemoryBroker`] that honours the same delivery contract:
//! key-routed partitions, per-partition ordering and consumer groups with a
//! single active reader per partition.

pub mod client;
pub mod error;
pub mod memory;
pub mod message;

pub use client::{Broker, Consumer, Producer};
pub use error::{BrokerError, Result};
pub use memory::{InMemoryBroker, InMemoryConsumer, InMemoryProducer};
pub use message::{BrokerMessage, ProducerRecord, RecordMetadata};
