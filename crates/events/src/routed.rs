use common::OrderId;
use serde::Serialize;

/// An event that can be published to the broker.
///
/// The partition key is always the order ID, so every event of one order lands
/// on the same partition and is consumed in publish order.
pub trait RoutedEvent: Serialize + Send + Sync + std::fmt::Debug {
    /// Destination topic.
    fn topic(&self) -> &'static str;

    /// Logical event type, carried in the `event-type` header.
    fn event_type(&self) -> &'static str;

    /// Correlation key of the order this event belongs to.
    fn order_id(&self) -> &OrderId;
}
