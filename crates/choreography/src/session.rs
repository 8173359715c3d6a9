//! Broker attachment with fixed-delay retry and orderly release.

use std::sync::Arc;

use broker::{Broker, BrokerError, Consumer, Producer};
use tokio_util::sync::CancellationToken;

use crate::connection::{ConnectionEvent, ConnectionMonitor};
use crate::retry::RetryPolicy;

/// Input topic and consumer group of a consuming service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub topic: String,
    pub group_id: String,
}

impl Subscription {
    pub fn new(topic: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            group_id: group_id.into(),
        }
    }
}

/// The broker handles a service needs before it counts as connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachPlan {
    pub subscription: Option<Subscription>,
    pub produces: bool,
}

impl AttachPlan {
    /// A producer only.
    pub fn producer() -> Self {
        Self {
            subscription: None,
            produces: true,
        }
    }

    /// A consumer subscribed from the current end of its topic.
    pub fn consumer(subscription: Subscription) -> Self {
        Self {
            subscription: Some(subscription),
            produces: false,
        }
    }

    /// Also attach a producer.
    pub fn with_producer(mut self) -> Self {
        self.produces = true;
        self
    }
}

/// Broker handles held while a service is connected.
pub struct Attachment<B: Broker> {
    pub consumer: Option<B::Consumer>,
    pub producer: Option<Arc<B::Producer>>,
}

/// Owns a service's connection to the broker.
///
/// Every transition of the service's [`ConnectionMonitor`] goes through the
/// session: attach attempts, session loss and shutdown.
pub struct BrokerSession<B: Broker> {
    broker: B,
    client_id: String,
    monitor: ConnectionMonitor,
    retry: RetryPolicy,
}

impl<B: Broker> BrokerSession<B> {
    pub fn new(broker: B, client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        Self {
            broker,
            monitor: ConnectionMonitor::new(client_id.clone()),
            client_id,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Makes one attempt to open every handle in `plan`.
    ///
    /// Handles opened before a later step fails are released again, so a
    /// failed attempt holds nothing.
    pub async fn try_attach(&self, plan: &AttachPlan) -> Result<Attachment<B>, BrokerError> {
        let consumer = match &plan.subscription {
            Some(subscription) => {
                let mut consumer = self
                    .broker
                    .connect_consumer(&self.client_id, &subscription.group_id)
                    .await?;
                if let Err(e) = consumer.subscribe(&subscription.topic, false).await {
                    self.release_consumer(consumer).await;
                    return Err(e);
                }
                Some(consumer)
            }
            None => None,
        };

        let producer = if plan.produces {
            match self.broker.connect_producer(&self.client_id).await {
                Ok(producer) => Some(Arc::new(producer)),
                Err(e) => {
                    if let Some(consumer) = consumer {
                        self.release_consumer(consumer).await;
                    }
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(Attachment { consumer, producer })
    }

    /// Attaches, retrying forever at the policy's fixed delay.
    ///
    /// Returns `None` if `shutdown` is cancelled first; the monitor is then
    /// left `Disconnected`.
    pub async fn attach(
        &self,
        plan: &AttachPlan,
        shutdown: &CancellationToken,
    ) -> Option<Attachment<B>> {
        let mut attempt: u64 = 0;
        loop {
            if shutdown.is_cancelled() {
                self.transition(ConnectionEvent::Shutdown);
                return None;
            }

            attempt += 1;
            self.transition(ConnectionEvent::AttachStarted);
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                result = self.try_attach(plan) => Some(result),
            };

            match result {
                None => {
                    self.transition(ConnectionEvent::Shutdown);
                    return None;
                }
                Some(Ok(attachment)) => {
                    self.transition(ConnectionEvent::AttachSucceeded);
                    tracing::info!(
                        client_id = %self.client_id,
                        attempt,
                        "attached to broker"
                    );
                    return Some(attachment);
                }
                Some(Err(e)) => {
                    self.transition(ConnectionEvent::AttachFailed);
                    tracing::warn!(
                        client_id = %self.client_id,
                        attempt,
                        error = %e,
                        retry_in = ?self.retry.delay(),
                        "broker attach failed, retrying"
                    );
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.transition(ConnectionEvent::Shutdown);
                    return None;
                }
                _ = tokio::time::sleep(self.retry.delay()) => {}
            }
        }
    }

    /// Records a lost session and releases what is left of it.
    pub async fn session_lost(&self, attachment: Attachment<B>, reason: &str) {
        self.transition(ConnectionEvent::SessionLost);
        tracing::warn!(client_id = %self.client_id, reason, "broker session lost");
        self.release(attachment).await;
    }

    /// Releases every handle, consumer first. Failures are logged only.
    pub async fn release(&self, attachment: Attachment<B>) {
        if let Some(consumer) = attachment.consumer {
            self.release_consumer(consumer).await;
        }
        if let Some(producer) = attachment.producer {
            if let Err(e) = producer.disconnect().await {
                tracing::warn!(client_id = %self.client_id, error = %e, "failed to release producer");
            }
        }
    }

    /// Releases the attachment, if any, and moves to `Disconnected`.
    pub async fn shutdown(&self, attachment: Option<Attachment<B>>) {
        if let Some(attachment) = attachment {
            self.release(attachment).await;
        }
        self.transition(ConnectionEvent::Shutdown);
        tracing::info!(client_id = %self.client_id, "broker session closed");
    }

    async fn release_consumer(&self, mut consumer: B::Consumer) {
        if let Err(e) = consumer.disconnect().await {
            tracing::warn!(client_id = %self.client_id, error = %e, "failed to release consumer");
        }
    }

    fn transition(&self, event: ConnectionEvent) {
        if let Err(e) = self.monitor.apply(event) {
            tracing::warn!(client_id = %self.client_id, error = %e, "ignored connection event");
        }
    }
}
