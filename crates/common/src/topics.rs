//! Broker topic and header names shared by all services.

/// Audit-only topic carrying `OrderCreated`. Nothing in the chain consumes it.
pub const ORDER_CREATED: &str = "order-created";

/// Topic carrying `PaymentRequested`, consumed by the billing service.
pub const PAYMENT_REQUESTS: &str = "payment-requests";

/// Topic carrying `NotificationRequested`, consumed by the notification service.
pub const NOTIFICATION_EVENTS: &str = "notification-events";

/// Header naming the logical type of the event in the payload.
pub const HEADER_EVENT_TYPE: &str = "event-type";

/// Header naming the service that produced the event.
pub const HEADER_SOURCE: &str = "source";
