//! Payment Processor: consumes `payment-requests`, settles each request
//! through a [`PaymentGateway`] and publishes the outcome to
//! `notification-events`.

pub mod gateway;
pub mod handler;

use std::sync::Arc;

use axum::Router;
use broker::Broker;
use choreography::{ConnectionMonitor, ConsumerService, Subscription};
use common::topics;
use metrics_exporter_prometheus::PrometheusHandle;

pub use gateway::{InMemoryPaymentGateway, PaymentGateway, SimulatedPaymentGateway};
pub use handler::PaymentHandler;

/// Client ID and `source` header value of this service.
pub const SERVICE_NAME: &str = "billing-service";

/// Consumer group shared by every billing instance.
pub const GROUP_ID: &str = "billing-service-group";

/// Builds the payment consumer service around `gateway`.
pub fn consumer_service<B: Broker, G: PaymentGateway>(
    broker: B,
    gateway: G,
) -> ConsumerService<B, PaymentHandler<G>> {
    ConsumerService::new(
        broker,
        SERVICE_NAME,
        Subscription::new(topics::PAYMENT_REQUESTS, GROUP_ID),
        Arc::new(PaymentHandler::new(gateway)),
    )
}

/// Creates the router: health and metrics only.
pub fn create_app(monitor: ConnectionMonitor, metrics_handle: PrometheusHandle) -> Router {
    choreography::service_router(Router::new(), monitor, metrics_handle)
}
