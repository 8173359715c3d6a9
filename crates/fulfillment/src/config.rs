//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address for every service (default: `"0.0.0.0"`)
/// - `ORDER_SERVICE_PORT`: order intake port (default: `3000`)
/// - `BILLING_SERVICE_PORT`: payment processor port (default: `3001`)
/// - `NOTIFICATION_SERVICE_PORT`: notifier port (default: `3002`)
/// - `KAFKA_BROKERS`: comma-separated broker addresses (default: `"kafka:9092"`)
/// - `BROKER_PARTITIONS`: partitions per topic (default: `3`)
/// - `BROKER_RETRY_DELAY_MS`: delay between attach attempts (default: `5000`)
/// - `PAYMENT_SUCCESS_RATE`: simulated approval probability (default: `0.95`)
/// - `NOTIFICATION_HISTORY_CAPACITY`: deliveries kept for inspection (default: `100`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub order_port: u16,
    pub billing_port: u16,
    pub notification_port: u16,
    pub brokers: Vec<String>,
    pub partitions: u32,
    pub retry_delay: Duration,
    pub payment_success_rate: f64,
    pub history_capacity: usize,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Missing or unparsable values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            order_port: parse(&lookup, "ORDER_SERVICE_PORT").unwrap_or(defaults.order_port),
            billing_port: parse(&lookup, "BILLING_SERVICE_PORT").unwrap_or(defaults.billing_port),
            notification_port: parse(&lookup, "NOTIFICATION_SERVICE_PORT")
                .unwrap_or(defaults.notification_port),
            brokers: lookup("KAFKA_BROKERS")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|b| !b.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|brokers| !brokers.is_empty())
                .unwrap_or(defaults.brokers),
            partitions: parse(&lookup, "BROKER_PARTITIONS")
                .filter(|p: &u32| *p > 0)
                .unwrap_or(defaults.partitions),
            retry_delay: parse(&lookup, "BROKER_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            payment_success_rate: parse(&lookup, "PAYMENT_SUCCESS_RATE")
                .filter(|rate: &f64| (0.0..=1.0).contains(rate))
                .unwrap_or(defaults.payment_success_rate),
            history_capacity: parse(&lookup, "NOTIFICATION_HISTORY_CAPACITY")
                .filter(|c: &usize| *c > 0)
                .unwrap_or(defaults.history_capacity),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Returns the `"host:port"` bind address string for `port`.
    pub fn addr(&self, port: u16) -> String {
        format!("{}:{}", self.host, port)
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|value| value.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            order_port: 3000,
            billing_port: 3001,
            notification_port: 3002,
            brokers: vec!["kafka:9092".to_string()],
            partitions: 3,
            retry_delay: Duration::from_millis(5000),
            payment_success_rate: 0.95,
            history_capacity: 100,
            log_level: "info".to_string(),
        }
    }
}
