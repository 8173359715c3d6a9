//! Order Intake: the HTTP entry point of the fulfillment chain.
//!
//! Accepts an order, stamps it `CREATED` and publishes `OrderCreated` (audit)
//! followed by `PaymentRequested`, both keyed by the new order ID. Nothing is
//! queued: without a broker connection the request is refused.

pub mod error;
pub mod intake;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use broker::Producer;
use metrics_exporter_prometheus::PrometheusHandle;

pub use intake::{IntakeError, NewOrder, OrderIntake};

/// Client ID and `source` header value of this service.
pub const SERVICE_NAME: &str = "order-service";

/// Creates the router: `POST /api/orders` plus health and metrics.
pub fn create_app<P: Producer>(
    intake: Arc<OrderIntake<P>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let monitor = intake.monitor().clone();
    let routes = Router::new()
        .route("/api/orders", post(routes::orders::create::<P>))
        .with_state(intake);

    choreography::service_router(routes, monitor, metrics_handle)
}
