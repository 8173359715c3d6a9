//! Notifier: consumes `notification-events`, delivers each notification
//! over the channel its outcome calls for and keeps the most recent
//! deliveries for inspection. This is the end of the chain; nothing is
//! published.

pub mod handler;
pub mod history;
pub mod routes;
pub mod sender;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use broker::Broker;
use choreography::{ConnectionMonitor, ConsumerService, Subscription};
use common::topics;
use metrics_exporter_prometheus::PrometheusHandle;

pub use handler::NotificationHandler;
pub use history::DeliveryHistory;
pub use sender::{InMemoryNotificationSender, NotificationSender, SimulatedNotificationSender};

/// Client ID of this service.
pub const SERVICE_NAME: &str = "notification-service";

/// Consumer group shared by every notifier instance.
pub const GROUP_ID: &str = "notification-service-group";

/// Builds the notification consumer service. Deliveries are appended to
/// `history`.
pub fn consumer_service<B: Broker, S: NotificationSender>(
    broker: B,
    sender: S,
    history: DeliveryHistory,
) -> ConsumerService<B, NotificationHandler<S>> {
    ConsumerService::new(
        broker,
        SERVICE_NAME,
        Subscription::new(topics::NOTIFICATION_EVENTS, GROUP_ID),
        Arc::new(NotificationHandler::new(sender, history)),
    )
    .without_producer()
}

/// Creates the router: `GET /api/notifications` plus health and metrics.
pub fn create_app(
    monitor: ConnectionMonitor,
    history: DeliveryHistory,
    metrics_handle: PrometheusHandle,
) -> Router {
    let routes = Router::new()
        .route("/api/notifications", get(routes::notifications::list))
        .with_state(history);

    choreography::service_router(routes, monitor, metrics_handle)
}
