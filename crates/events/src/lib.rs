//! Event contracts for the order-fulfillment choreography.
//!
//! Each service reacts to one event and emits a richer one; nothing is ever
//! updated in place. The events carry the same [`OrderId`](common::OrderId)
//! from intake to notification, and that ID is also the partition key every
//! publisher routes on.
//!
//! ```text
//! OrderCreated ─┐
//!               └─► PaymentRequested ──► NotificationRequested ──► DeliveryRecord
//! ```

pub mod delivery;
pub mod error;
pub mod order;
pub mod payment;
pub mod routed;

pub use delivery::{Channel, DeliveryRecord, DeliveryStatus};
pub use error::EventError;
pub use order::{LineItem, OrderCreated, OrderStatus, PaymentRequested};
pub use payment::{NotificationRequested, PaymentOutcome};
pub use routed::RoutedEvent;
