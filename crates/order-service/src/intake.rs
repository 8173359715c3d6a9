//! The order intake publish sequence.

use broker::Producer;
use choreography::{ConnectionMonitor, PublishError, PublisherSlot};
use common::{Money, OrderId};
use events::{LineItem, OrderCreated};
use thiserror::Error;

/// Errors raised while placing an order.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// No producer is attached; nothing was published.
    #[error("Broker connection not established")]
    Unavailable,

    /// At least one of the two events could not be published.
    #[error("Failed to publish events for order {order_id}: {source}")]
    Publish {
        order_id: OrderId,
        #[source]
        source: PublishError,
    },
}

/// A validated order that has not been placed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
}

/// Places orders by publishing `OrderCreated` then `PaymentRequested`.
pub struct OrderIntake<P: Producer> {
    monitor: ConnectionMonitor,
    publisher: PublisherSlot<P>,
}

impl<P: Producer> OrderIntake<P> {
    pub fn new(monitor: ConnectionMonitor, publisher: PublisherSlot<P>) -> Self {
        Self { monitor, publisher }
    }

    pub fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    /// Returns true if the producer is attached and orders can be accepted.
    pub async fn is_ready(&self) -> bool {
        self.monitor.is_connected() && self.publisher.get().await.is_some()
    }

    /// Assigns an order ID and publishes both events, keyed by that ID.
    ///
    /// Both publishes are attempted even if the first fails; the first
    /// failure is returned. A connectivity failure also reports the producer
    /// session lost, so later requests are refused until it is reattached.
    #[tracing::instrument(skip(self, order), fields(customer_id = %order.customer_id))]
    pub async fn place(&self, order: NewOrder) -> Result<OrderCreated, IntakeError> {
        if !self.monitor.is_connected() {
            return Err(IntakeError::Unavailable);
        }
        let publisher = self.publisher.get().await.ok_or(IntakeError::Unavailable)?;

        let order = OrderCreated::place(order.customer_id, order.items, order.total_amount);
        tracing::info!(order_id = %order.order_id, "creating order");

        let created = publisher.publish(&order).await;
        let requested = publisher.publish(&order.payment_request()).await;
        if let Err(source) = created.and(requested) {
            if source.is_connectivity() && self.publisher.report_lost(&publisher).await {
                tracing::warn!(error = %source, "broker session lost while publishing");
            }
            return Err(IntakeError::Publish {
                order_id: order.order_id,
                source,
            });
        }

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.order_id, "order created and payment requested");
        Ok(order)
    }
}
