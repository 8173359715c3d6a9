//! Events emitted by the billing service.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, topics};
use serde::{Deserialize, Serialize};

use crate::delivery::Channel;
use crate::error::EventError;
use crate::order::PaymentRequested;
use crate::routed::RoutedEvent;

/// What the payment capability decided.
///
/// Both variants are valid results; a declined payment is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Approved { transaction_id: String },
    Declined { reason: String },
}

impl PaymentOutcome {
    /// Returns true if the payment was approved.
    pub fn is_approved(&self) -> bool {
        matches!(self, PaymentOutcome::Approved { .. })
    }
}

/// A request to tell the customer how their payment went.
///
/// `transaction_id` is present exactly when `success` is true and
/// `error_message` exactly when it is false. [`from_outcome`] guarantees this
/// for events built here; [`check_consistency`] rejects foreign ones that
/// break it.
///
/// [`from_outcome`]: NotificationRequested::from_outcome
/// [`check_consistency`]: NotificationRequested::check_consistency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequested {
    pub order_id: OrderId,
    pub customer_id: String,
    pub success: bool,
    pub amount: Money,
    pub transaction_id: Option<String>,
    pub error_message: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NotificationRequested {
    /// Builds the notification for a settled payment request.
    pub fn from_outcome(request: &PaymentRequested, outcome: PaymentOutcome) -> Self {
        let (success, transaction_id, error_message, message) = match outcome {
            PaymentOutcome::Approved { transaction_id } => (
                true,
                Some(transaction_id),
                None,
                format!("Payment of {} processed successfully", request.amount),
            ),
            PaymentOutcome::Declined { reason } => {
                let message = format!("Payment failed: {reason}");
                (false, None, Some(reason), message)
            }
        };

        Self {
            order_id: request.order_id.clone(),
            customer_id: request.customer_id.clone(),
            success,
            amount: request.amount,
            transaction_id,
            error_message,
            message,
            timestamp: Utc::now(),
        }
    }

    /// Verifies the success flag agrees with the outcome metadata.
    pub fn check_consistency(&self) -> Result<(), EventError> {
        if self.order_id.is_blank() {
            return Err(EventError::MissingOrderId);
        }
        let has_transaction = self.transaction_id.is_some();
        let has_error = self.error_message.is_some();
        let consistent = if self.success {
            has_transaction && !has_error
        } else {
            !has_transaction && has_error
        };
        if consistent {
            Ok(())
        } else {
            Err(EventError::InconsistentOutcome {
                order_id: self.order_id.clone(),
                success: self.success,
                has_transaction,
                has_error,
            })
        }
    }

    /// Channel used to reach the customer for this outcome.
    pub fn channel(&self) -> Channel {
        Channel::for_payment(self.success)
    }
}

impl RoutedEvent for NotificationRequested {
    fn topic(&self) -> &'static str {
        topics::NOTIFICATION_EVENTS
    }

    fn event_type(&self) -> &'static str {
        if self.success {
            "PaymentSucceeded"
        } else {
            "PaymentFailed"
        }
    }

    fn order_id(&self) -> &OrderId {
        &self.order_id
    }
}
