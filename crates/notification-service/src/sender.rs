//! Notification sender trait, simulated sender and in-memory implementation.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use choreography::CapabilityError;
use events::{DeliveryRecord, NotificationRequested};
use rand::Rng;

const CAPABILITY: &str = "notification sender";

/// Delivers notifications to customers.
#[async_trait]
pub trait NotificationSender: Send + Sync + 'static {
    /// Sends `notification` over its outcome channel and returns the record
    /// of the delivery.
    async fn deliver(
        &self,
        notification: &NotificationRequested,
    ) -> Result<DeliveryRecord, CapabilityError>;
}

/// Sender that waits a random 100 to 400 ms and always succeeds.
#[derive(Debug, Clone)]
pub struct SimulatedNotificationSender {
    min_latency: Duration,
    max_latency: Duration,
}

impl SimulatedNotificationSender {
    pub fn new() -> Self {
        Self {
            min_latency: Duration::from_millis(100),
            max_latency: Duration::from_millis(400),
        }
    }

    /// Overrides the latency bounds.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min.min(max);
        self.max_latency = min.max(max);
        self
    }
}

impl Default for SimulatedNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSender for SimulatedNotificationSender {
    async fn deliver(
        &self,
        notification: &NotificationRequested,
    ) -> Result<DeliveryRecord, CapabilityError> {
        let latency = rand::rng().random_range(self.min_latency..=self.max_latency);
        tokio::time::sleep(latency).await;

        Ok(DeliveryRecord::sent(notification))
    }
}

#[derive(Debug, Default)]
struct InMemorySenderState {
    delivered: Vec<DeliveryRecord>,
    unreachable: bool,
}

/// Deterministic sender for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSender {
    state: Arc<RwLock<InMemorySenderState>>,
}

impl InMemoryNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later delivery fail.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .unreachable = unreachable;
    }

    /// Returns every delivery made so far.
    pub fn delivered(&self) -> Vec<DeliveryRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .delivered
            .clone()
    }
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn deliver(
        &self,
        notification: &NotificationRequested,
    ) -> Result<DeliveryRecord, CapabilityError> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.unreachable {
            return Err(CapabilityError::new(CAPABILITY, "provider unreachable"));
        }
        let record = DeliveryRecord::sent(notification);
        state.delivered.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{Money, OrderId};
    use events::{Channel, PaymentOutcome, PaymentRequested};

    fn notification(success: bool) -> NotificationRequested {
        let request = PaymentRequested {
            order_id: OrderId::new("order-1"),
            customer_id: "c1".to_string(),
            amount: Money::from_major(50),
            requested_at: Utc::now(),
        };
        let outcome = if success {
            PaymentOutcome::Approved {
                transaction_id: "txn-1".to_string(),
            }
        } else {
            PaymentOutcome::Declined {
                reason: "Payment processing failed".to_string(),
            }
        };
        NotificationRequested::from_outcome(&request, outcome)
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_sender_picks_channel_from_outcome() {
        let sender = SimulatedNotificationSender::new();

        let record = sender.deliver(&notification(true)).await.unwrap();
        assert_eq!(record.channel, Channel::Email);
        assert!(record.id.starts_with("notif-"));

        let record = sender.deliver(&notification(false)).await.unwrap();
        assert_eq!(record.channel, Channel::Sms);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_latency_within_bounds() {
        let sender = SimulatedNotificationSender::new();
        let started = tokio::time::Instant::now();
        sender.deliver(&notification(true)).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed <= Duration::from_millis(401));
    }

    #[tokio::test]
    async fn test_in_memory_sender() {
        let sender = InMemoryNotificationSender::new();
        sender.deliver(&notification(true)).await.unwrap();
        assert_eq!(sender.delivered().len(), 1);

        sender.set_unreachable(true);
        assert!(sender.deliver(&notification(true)).await.is_err());
        assert_eq!(sender.delivered().len(), 1);
    }
}
