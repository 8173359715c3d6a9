//! Payment gateway trait, simulated gateway and in-memory implementation.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use choreography::CapabilityError;
use events::{PaymentOutcome, PaymentRequested};
use rand::Rng;
use uuid::Uuid;

/// Probability that [`SimulatedPaymentGateway`] approves a payment.
pub const DEFAULT_SUCCESS_RATE: f64 = 0.95;

/// Reason given for payments the simulated gateway declines.
pub const DECLINE_REASON: &str = "Payment processing failed";

const CAPABILITY: &str = "payment gateway";

/// Settles payment requests.
#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Charges the customer. Approval and decline are both `Ok`; `Err` means
    /// no outcome could be obtained.
    async fn settle(&self, request: &PaymentRequested) -> Result<PaymentOutcome, CapabilityError>;
}

fn transaction_id() -> String {
    format!("txn-{}", Uuid::new_v4())
}

/// Gateway with random latency and a fixed approval probability.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentGateway {
    success_rate: f64,
    min_latency: Duration,
    max_latency: Duration,
}

impl SimulatedPaymentGateway {
    /// Creates a gateway approving with probability `success_rate`
    /// (clamped to `0.0..=1.0`) after 500 to 1500 ms.
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_finite() {
            success_rate.clamp(0.0, 1.0)
        } else {
            DEFAULT_SUCCESS_RATE
        };
        Self {
            success_rate,
            min_latency: Duration::from_millis(500),
            max_latency: Duration::from_millis(1500),
        }
    }

    /// Overrides the latency bounds.
    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min.min(max);
        self.max_latency = min.max(max);
        self
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for SimulatedPaymentGateway {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_RATE)
    }
}

#[async_trait]
impl PaymentGateway for SimulatedPaymentGateway {
    async fn settle(&self, request: &PaymentRequested) -> Result<PaymentOutcome, CapabilityError> {
        // ThreadRng is not Send: draw everything before the first await
        let (latency, approved) = {
            let mut rng = rand::rng();
            let latency = rng.random_range(self.min_latency..=self.max_latency);
            (latency, rng.random_bool(self.success_rate))
        };

        tokio::time::sleep(latency).await;
        tracing::debug!(
            order_id = %request.order_id,
            ?latency,
            approved,
            "simulated payment settled"
        );

        Ok(if approved {
            PaymentOutcome::Approved {
                transaction_id: transaction_id(),
            }
        } else {
            PaymentOutcome::Declined {
                reason: DECLINE_REASON.to_string(),
            }
        })
    }
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    charges: Vec<PaymentRequested>,
    decline_reason: Option<String>,
    unreachable: bool,
}

/// Deterministic gateway for testing: approves everything unless told
/// otherwise.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines every later payment with `reason`, or approves again with `None`.
    pub fn set_decline(&self, reason: Option<&str>) {
        self.write().decline_reason = reason.map(str::to_string);
    }

    /// Makes every later call fail without an outcome.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.write().unreachable = unreachable;
    }

    /// Returns every request that reached the gateway, in call order.
    pub fn charges(&self) -> Vec<PaymentRequested> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .charges
            .clone()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryGatewayState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn settle(&self, request: &PaymentRequested) -> Result<PaymentOutcome, CapabilityError> {
        let mut state = self.write();
        if state.unreachable {
            return Err(CapabilityError::new(CAPABILITY, "gateway unreachable"));
        }
        state.charges.push(request.clone());

        Ok(match &state.decline_reason {
            Some(reason) => PaymentOutcome::Declined {
                reason: reason.clone(),
            },
            None => PaymentOutcome::Approved {
                transaction_id: transaction_id(),
            },
        })
    }
}
