//! Records produced by the notification service.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payment::NotificationRequested;

/// How a customer is contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
}

impl Channel {
    /// Successful payments are confirmed by email; failures escalate to SMS.
    pub fn for_payment(success: bool) -> Self {
        if success { Channel::Email } else { Channel::Sms }
    }

    /// Returns the channel name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Sms => "SMS",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery status of a notification. Only successful sends are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    #[default]
    Sent,
}

/// A notification that was sent to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub id: String,
    pub customer_id: String,
    pub order_id: OrderId,
    pub channel: Channel,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub delivery_status: DeliveryStatus,
}

impl DeliveryRecord {
    /// Records that `notification` was sent just now over its outcome channel.
    pub fn sent(notification: &NotificationRequested) -> Self {
        Self {
            id: format!("notif-{}", Uuid::new_v4().simple()),
            customer_id: notification.customer_id.clone(),
            order_id: notification.order_id.clone(),
            channel: notification.channel(),
            message: notification.message.clone(),
            sent_at: Utc::now(),
            delivery_status: DeliveryStatus::Sent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::PaymentRequested;
    use crate::payment::PaymentOutcome;
    use common::Money;

    fn notification(outcome: PaymentOutcome) -> NotificationRequested {
        let request = PaymentRequested {
            order_id: OrderId::new("order-7"),
            customer_id: "c7".to_string(),
            amount: Money::from_major(12),
            requested_at: Utc::now(),
        };
        NotificationRequested::from_outcome(&request, outcome)
    }

    #[test]
    fn channel_is_pure_function_of_success() {
        assert_eq!(Channel::for_payment(true), Channel::Email);
        assert_eq!(Channel::for_payment(false), Channel::Sms);
    }

    #[test]
    fn sent_record_copies_correlation_and_message() {
        let n = notification(PaymentOutcome::Declined {
            reason: "card expired".to_string(),
        });
        let record = DeliveryRecord::sent(&n);

        assert!(record.id.starts_with("notif-"));
        assert_eq!(record.order_id, n.order_id);
        assert_eq!(record.customer_id, "c7");
        assert_eq!(record.channel, Channel::Sms);
        assert_eq!(record.message, n.message);
        assert_eq!(record.delivery_status, DeliveryStatus::Sent);
    }

    #[test]
    fn record_ids_are_unique() {
        let n = notification(PaymentOutcome::Approved {
            transaction_id: "txn-1".to_string(),
        });
        assert_ne!(DeliveryRecord::sent(&n).id, DeliveryRecord::sent(&n).id);
    }

    #[test]
    fn wire_format() {
        let n = notification(PaymentOutcome::Approved {
            transaction_id: "txn-1".to_string(),
        });
        let json = serde_json::to_value(DeliveryRecord::sent(&n)).unwrap();

        assert_eq!(json["channel"], "EMAIL");
        assert_eq!(json["deliveryStatus"], "SENT");
        assert_eq!(json["orderId"], "order-7");
        assert!(json["sentAt"].as_str().is_some());
    }
}
