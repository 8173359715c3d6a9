use async_trait::async_trait;
use choreography::{CapabilityError, MessageHandler, NoEvent};
use events::{EventError, NotificationRequested};

use crate::history::DeliveryHistory;
use crate::sender::NotificationSender;

/// Delivers each `NotificationRequested` and records the delivery.
pub struct NotificationHandler<S: NotificationSender> {
    sender: S,
    history: DeliveryHistory,
}

impl<S: NotificationSender> NotificationHandler<S> {
    pub fn new(sender: S, history: DeliveryHistory) -> Self {
        Self { sender, history }
    }
}

#[async_trait]
impl<S: NotificationSender> MessageHandler for NotificationHandler<S> {
    type Input = NotificationRequested;
    type Output = NoEvent;

    fn validate(&self, input: &NotificationRequested) -> Result<(), EventError> {
        input.check_consistency()
    }

    #[tracing::instrument(
        skip(self, input),
        fields(order_id = %input.order_id, customer_id = %input.customer_id)
    )]
    async fn handle(&self, input: NotificationRequested) -> Result<Option<NoEvent>, CapabilityError> {
        tracing::info!("sending notification");
        let record = self.sender.deliver(&input).await?;
        tracing::info!(channel = %record.channel, id = %record.id, "notification sent");
        metrics::counter!("notifications_sent_total", "channel" => record.channel.as_str())
            .increment(1);

        self.history.record(record).await;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::InMemoryNotificationSender;
    use chrono::Utc;
    use common::{Money, OrderId};
    use events::{Channel, PaymentOutcome, PaymentRequested};

    fn declined() -> NotificationRequested {
        let request = PaymentRequested {
            order_id: OrderId::new("order-2"),
            customer_id: "c2".to_string(),
            amount: Money::from_major(30),
            requested_at: Utc::now(),
        };
        NotificationRequested::from_outcome(
            &request,
            PaymentOutcome::Declined {
                reason: "Payment processing failed".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_delivery_is_recorded_and_nothing_published() {
        let history = DeliveryHistory::new(10);
        let handler = NotificationHandler::new(InMemoryNotificationSender::new(), history.clone());

        assert!(handler.handle(declined()).await.unwrap().is_none());

        let records = history.snapshot().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].channel, Channel::Sms);
        assert_eq!(records[0].order_id.as_str(), "order-2");
        assert_eq!(records[0].message, "Payment failed: Payment processing failed");
    }

    #[tokio::test]
    async fn test_failed_delivery_is_not_recorded() {
        let history = DeliveryHistory::new(10);
        let sender = InMemoryNotificationSender::new();
        sender.set_unreachable(true);
        let handler = NotificationHandler::new(sender, history.clone());

        assert!(handler.handle(declined()).await.is_err());
        assert!(history.is_empty().await);
    }

    #[test]
    fn test_inconsistent_event_is_rejected() {
        let handler = NotificationHandler::new(InMemoryNotificationSender::new(), DeliveryHistory::default());
        let mut event = declined();
        event.transaction_id = Some("txn-9".to_string());
        assert!(handler.validate(&event).is_err());
    }
}
