//! Runs Order Intake, Payment Processor and Notifier against one broker.
//!
//! Each service keeps its own connection lifecycle and HTTP router; the
//! only thing they share is the broker and the cancellation token.

pub mod config;
pub mod error;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use billing_service::{PaymentGateway, SimulatedPaymentGateway};
use broker::Broker;
use choreography::{ConnectionMonitor, ProducerService, RetryPolicy};
use metrics_exporter_prometheus::PrometheusHandle;
use notification_service::{DeliveryHistory, NotificationSender, SimulatedNotificationSender};
use order_service::OrderIntake;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

pub use config::Config;
pub use error::FulfillmentError;

/// The three running services and their routers.
pub struct Fulfillment {
    pub order_app: Router,
    pub billing_app: Router,
    pub notification_app: Router,
    pub history: DeliveryHistory,
    monitors: Vec<ConnectionMonitor>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Fulfillment {
    /// Waits until every service holds a broker session.
    pub async fn wait_until_connected(&self) {
        for monitor in &self.monitors {
            monitor.wait_for_connected().await;
        }
    }

    /// Connection monitors in start order: orders, billing, notifications.
    pub fn monitors(&self) -> &[ConnectionMonitor] {
        &self.monitors
    }

    /// Waits for every service task to finish. Tasks only finish after the
    /// shutdown token is cancelled.
    pub async fn join(self) {
        for (service, task) in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(service, error = %e, "service task failed");
            }
        }
    }
}

/// Starts all three services with the simulated payment gateway and
/// notification sender.
pub fn start<B: Broker + Clone>(
    config: &Config,
    broker: B,
    metrics_handle: PrometheusHandle,
    shutdown: CancellationToken,
) -> Fulfillment {
    start_with(
        config,
        broker,
        metrics_handle,
        shutdown,
        SimulatedPaymentGateway::new(config.payment_success_rate),
        SimulatedNotificationSender::new(),
    )
}

/// Starts all three services with the given capabilities. Must be called
/// from within a Tokio runtime.
pub fn start_with<B, G, S>(
    config: &Config,
    broker: B,
    metrics_handle: PrometheusHandle,
    shutdown: CancellationToken,
    gateway: G,
    sender: S,
) -> Fulfillment
where
    B: Broker + Clone,
    G: PaymentGateway,
    S: NotificationSender,
{
    let retry = RetryPolicy::fixed(config.retry_delay);

    let orders =
        ProducerService::new(broker.clone(), order_service::SERVICE_NAME).with_retry(retry);
    let intake = Arc::new(OrderIntake::new(orders.monitor(), orders.publisher()));
    let order_app = order_service::create_app(intake, metrics_handle.clone());

    let billing = billing_service::consumer_service(broker.clone(), gateway).with_retry(retry);
    let billing_app = billing_service::create_app(billing.monitor(), metrics_handle.clone());

    let history = DeliveryHistory::new(config.history_capacity);
    let notifications =
        notification_service::consumer_service(broker, sender, history.clone()).with_retry(retry);
    let notification_app = notification_service::create_app(
        notifications.monitor(),
        history.clone(),
        metrics_handle,
    );

    let monitors = vec![orders.monitor(), billing.monitor(), notifications.monitor()];
    let tasks = vec![
        (
            order_service::SERVICE_NAME,
            tokio::spawn(orders.run(shutdown.clone())),
        ),
        (
            billing_service::SERVICE_NAME,
            tokio::spawn(billing.run(shutdown.clone())),
        ),
        (
            notification_service::SERVICE_NAME,
            tokio::spawn(notifications.run(shutdown)),
        ),
    ];

    Fulfillment {
        order_app,
        billing_app,
        notification_app,
        history,
        monitors,
        tasks,
    }
}

/// Binds the listener for `service`.
pub async fn bind(service: &'static str, addr: String) -> Result<TcpListener, FulfillmentError> {
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| FulfillmentError::Bind {
            service,
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(service, %addr, "HTTP server listening");
    Ok(listener)
}

/// Serves `app` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    service: &'static str,
    listener: TcpListener,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), FulfillmentError> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|source| FulfillmentError::Serve { service, source })?;

    tracing::info!(service, "HTTP server stopped");
    Ok(())
}

/// Waits for `stop` or for any server to exit, cancels `shutdown`, then
/// drains every server. Returns the first server error.
pub async fn supervise(
    mut servers: JoinSet<Result<(), FulfillmentError>>,
    stop: impl Future<Output = ()>,
    shutdown: CancellationToken,
) -> Result<(), FulfillmentError> {
    let mut failure = None;
    tokio::select! {
        () = stop => {}
        Some(result) = servers.join_next() => {
            tracing::error!("HTTP server exited unexpectedly, shutting down");
            record(result, &mut failure);
        }
    }
    shutdown.cancel();

    while let Some(result) = servers.join_next().await {
        record(result, &mut failure);
    }
    failure.map_or(Ok(()), Err)
}

fn record(
    result: Result<Result<(), FulfillmentError>, JoinError>,
    failure: &mut Option<FulfillmentError>,
) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(error = %e, "HTTP server failed");
            failure.get_or_insert(e);
        }
        Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
    }
}
