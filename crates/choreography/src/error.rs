//! Error types for the choreography core.

use broker::BrokerError;
use events::EventError;
use thiserror::Error;

use crate::connection::{ConnectionEvent, ConnectionState};

/// Errors raised by the connection state machine.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The event is not allowed in the current state.
    #[error("Invalid connection transition: {event:?} while {from}")]
    InvalidTransition {
        from: ConnectionState,
        event: ConnectionEvent,
    },
}

/// A domain capability (payment settlement, notification delivery) could not
/// produce an outcome at all.
///
/// A negative business outcome such as a declined payment is not a
/// `CapabilityError`; it is a regular result.
#[derive(Debug, Error)]
#[error("{capability} failed: {reason}")]
pub struct CapabilityError {
    pub capability: &'static str,
    pub reason: String,
}

impl CapabilityError {
    pub fn new(capability: &'static str, reason: impl Into<String>) -> Self {
        Self {
            capability,
            reason: reason.into(),
        }
    }
}

/// Errors raised while publishing an event.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The event could not be serialized.
    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    /// The broker rejected or did not acknowledge the record.
    #[error("Failed to publish event: {0}")]
    Broker(#[from] BrokerError),
}

impl PublishError {
    /// Returns true if the broker session itself is gone.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, PublishError::Broker(e) if e.is_connectivity())
    }
}

/// The pipeline stage a message failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Decode,
    Transform,
    Encode,
    Publish,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Decode => "decode",
            PipelineStage::Transform => "transform",
            PipelineStage::Encode => "encode",
            PipelineStage::Publish => "publish",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-message pipeline failure. The message is dropped, never retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The payload is not the expected event shape.
    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// The payload decoded but breaks the event contract.
    #[error("Message violates event contract: {0}")]
    Invalid(#[from] EventError),

    /// The domain capability could not be invoked.
    #[error("Capability invocation failed: {0}")]
    Capability(#[from] CapabilityError),

    /// The downstream event could not be serialized.
    #[error("Failed to encode downstream event: {0}")]
    Encode(#[source] serde_json::Error),

    /// The downstream event could not be published.
    #[error("Failed to publish downstream event: {0}")]
    Publish(#[source] BrokerError),

    /// The handler produced an event but no producer is attached.
    #[error("No producer attached for downstream publication")]
    NoProducer,
}

impl PipelineError {
    /// Returns the stage that failed.
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Decode(_) | PipelineError::Invalid(_) => PipelineStage::Decode,
            PipelineError::Capability(_) => PipelineStage::Transform,
            PipelineError::Encode(_) => PipelineStage::Encode,
            PipelineError::Publish(_) | PipelineError::NoProducer => PipelineStage::Publish,
        }
    }
}

impl From<PublishError> for PipelineError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Encode(e) => PipelineError::Encode(e),
            PublishError::Broker(e) => PipelineError::Publish(e),
        }
    }
}
