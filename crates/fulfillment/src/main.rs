//! Fulfillment entry point.

use broker::InMemoryBroker;
use fulfillment::{Config, FulfillmentError};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), FulfillmentError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Bind every listener before anything connects
    let order_listener =
        fulfillment::bind(order_service::SERVICE_NAME, config.addr(config.order_port)).await?;
    let billing_listener =
        fulfillment::bind(billing_service::SERVICE_NAME, config.addr(config.billing_port)).await?;
    let notification_listener = fulfillment::bind(
        notification_service::SERVICE_NAME,
        config.addr(config.notification_port),
    )
    .await?;

    // 4. Start the services against the in-process broker
    tracing::info!(
        brokers = ?config.brokers,
        partitions = config.partitions,
        retry_delay = ?config.retry_delay,
        "starting fulfillment services"
    );
    let broker = InMemoryBroker::with_partitions(config.partitions);
    let shutdown = CancellationToken::new();
    let services = fulfillment::start(&config, broker, metrics_handle, shutdown.clone());

    // 5. Serve every router until a signal arrives or a server exits
    let mut servers = JoinSet::new();
    servers.spawn(fulfillment::serve(
        order_service::SERVICE_NAME,
        order_listener,
        services.order_app.clone(),
        shutdown.clone(),
    ));
    servers.spawn(fulfillment::serve(
        billing_service::SERVICE_NAME,
        billing_listener,
        services.billing_app.clone(),
        shutdown.clone(),
    ));
    servers.spawn(fulfillment::serve(
        notification_service::SERVICE_NAME,
        notification_listener,
        services.notification_app.clone(),
        shutdown.clone(),
    ));

    let served = fulfillment::supervise(servers, shutdown_signal(), shutdown).await;
    services.join().await;

    if served.is_ok() {
        tracing::info!("fulfillment shut down gracefully");
    }
    served
}
