use thiserror::Error;

/// Errors that stop the fulfillment process from starting or serving.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("failed to install Prometheus recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {service} to {addr}: {source}")]
    Bind {
        service: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{service} HTTP server failed: {source}")]
    Serve {
        service: &'static str,
        #[source]
        source: std::io::Error,
    },
}
