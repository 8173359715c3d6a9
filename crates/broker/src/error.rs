use thiserror::Error;

/// Errors that can occur when interacting with the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker could not be reached, or the session to it was lost.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),

    /// The client handle was used after it was disconnected.
    #[error("Client '{0}' is not connected")]
    NotConnected(String),

    /// A consumer tried to fetch before subscribing to any topic.
    #[error("Consumer '{0}' has no subscriptions")]
    NotSubscribed(String),

    /// The topic name is not usable.
    #[error("Invalid topic name: {0:?}")]
    InvalidTopic(String),
}

impl BrokerError {
    /// Returns true if the error means the session itself is gone, as opposed
    /// to a problem with a single request.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            BrokerError::Unavailable(_) | BrokerError::NotConnected(_)
        )
    }
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
