//! Events emitted by order intake.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, topics};
use serde::{Deserialize, Serialize};

use crate::routed::RoutedEvent;

/// Lifecycle status of an order as seen by intake.
///
/// Intake only ever emits `Created`; later progress is carried by downstream
/// events rather than by updating the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Created,
}

impl OrderStatus {
    /// Returns the status name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    #[serde(alias = "price")]
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

impl LineItem {
    /// Creates a line item whose subtotal is `unit_price * quantity`, or
    /// `None` if that does not fit in a `Money`.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Option<Self> {
        let subtotal = unit_price.multiply(quantity)?;
        Some(Self::with_subtotal(
            product_id, name, unit_price, quantity, subtotal,
        ))
    }

    /// Creates a line item carrying the subtotal the client supplied.
    pub fn with_subtotal(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
        subtotal: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            subtotal,
        }
    }
}

/// An order accepted by intake. Published for audit to `order-created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderCreated {
    /// Places a new order: assigns a fresh order ID, stamps `CREATED` and
    /// the creation time.
    pub fn place(customer_id: impl Into<String>, items: Vec<LineItem>, total_amount: Money) -> Self {
        Self {
            order_id: OrderId::generate(),
            customer_id: customer_id.into(),
            items,
            total_amount,
            status: OrderStatus::Created,
            created_at: Utc::now(),
        }
    }

    /// Derives the payment request for this order.
    pub fn payment_request(&self) -> PaymentRequested {
        PaymentRequested {
            order_id: self.order_id.clone(),
            customer_id: self.customer_id.clone(),
            amount: self.total_amount,
            requested_at: Utc::now(),
        }
    }
}

impl RoutedEvent for OrderCreated {
    fn topic(&self) -> &'static str {
        topics::ORDER_CREATED
    }

    fn event_type(&self) -> &'static str {
        "OrderCreated"
    }

    fn order_id(&self) -> &OrderId {
        &self.order_id
    }
}

/// A request to charge the customer for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequested {
    pub order_id: OrderId,
    pub customer_id: String,
    pub amount: Money,
    pub requested_at: DateTime<Utc>,
}

impl RoutedEvent for PaymentRequested {
    fn topic(&self) -> &'static str {
        topics::PAYMENT_REQUESTS
    }

    fn event_type(&self) -> &'static str {
        "PaymentRequested"
    }

    fn order_id(&self) -> &OrderId {
        &self.order_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> LineItem {
        LineItem::new("p1", "Widget", Money::from_major(10), 2).unwrap()
    }

    #[test]
    fn line_item_computes_subtotal() {
        let item = widget();
        assert_eq!(item.subtotal, Money::from_major(20));

        let item = LineItem::with_subtotal(
            "p1",
            "Widget",
            Money::from_major(10),
            2,
            Money::from_cents(1999),
        );
        assert_eq!(item.subtotal.cents(), 1999);
    }

    #[test]
    fn line_item_rejects_overflowing_subtotal() {
        let unit_price = Money::from_major(10_000_000_000);
        assert!(LineItem::new("p1", "Widget", unit_price, 4_000_000_000).is_none());
    }

    #[test]
    fn line_item_accepts_price_alias() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "productId": "p1",
            "name": "Widget",
            "price": 10,
            "quantity": 2,
            "subtotal": 20
        }))
        .unwrap();
        assert_eq!(item, widget());
    }

    #[test]
    fn place_stamps_created_status_and_fresh_id() {
        let a = OrderCreated::place("c1", vec![widget()], Money::from_major(20));
        let b = OrderCreated::place("c1", vec![widget()], Money::from_major(20));

        assert_eq!(a.status, OrderStatus::Created);
        assert_ne!(a.order_id, b.order_id);
        assert_eq!(a.customer_id, "c1");
    }

    #[test]
    fn payment_request_carries_order_correlation() {
        let order = OrderCreated::place("c1", vec![widget()], Money::from_major(20));
        let request = order.payment_request();

        assert_eq!(request.order_id, order.order_id);
        assert_eq!(request.customer_id, order.customer_id);
        assert_eq!(request.amount, order.total_amount);
        assert_eq!(request.order_id(), order.order_id());
    }

    #[test]
    fn order_created_wire_format() {
        let order = OrderCreated::place("c1", vec![widget()], Money::from_major(20));
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["orderId"], order.order_id.as_str());
        assert_eq!(json["customerId"], "c1");
        assert_eq!(json["status"], "CREATED");
        assert_eq!(json["totalAmount"], 20);
        assert_eq!(json["items"][0]["unitPrice"], 10);
        assert_eq!(json["items"][0]["productId"], "p1");
        assert!(json["createdAt"].as_str().is_some());
    }

    #[test]
    fn routing_metadata() {
        let order = OrderCreated::place("c1", vec![widget()], Money::from_major(20));
        assert_eq!(order.topic(), "order-created");
        assert_eq!(order.event_type(), "OrderCreated");

        let request = order.payment_request();
        assert_eq!(request.topic(), "payment-requests");
        assert_eq!(request.event_type(), "PaymentRequested");
    }
}
