use async_trait::async_trait;
use choreography::{CapabilityError, MessageHandler};
use events::{EventError, NotificationRequested, PaymentRequested};

use crate::gateway::PaymentGateway;

/// Turns each `PaymentRequested` into a `NotificationRequested` carrying the
/// gateway's outcome.
pub struct PaymentHandler<G: PaymentGateway> {
    gateway: G,
}

impl<G: PaymentGateway> PaymentHandler<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }
}

#[async_trait]
impl<G: PaymentGateway> MessageHandler for PaymentHandler<G> {
    type Input = PaymentRequested;
    type Output = NotificationRequested;

    fn validate(&self, input: &PaymentRequested) -> Result<(), EventError> {
        if input.order_id.is_blank() {
            return Err(EventError::MissingOrderId);
        }
        Ok(())
    }

    #[tracing::instrument(
        skip(self, input),
        fields(order_id = %input.order_id, amount = %input.amount)
    )]
    async fn handle(
        &self,
        input: PaymentRequested,
    ) -> Result<Option<NotificationRequested>, CapabilityError> {
        tracing::info!("processing payment");
        let outcome = self.gateway.settle(&input).await?;
        tracing::info!(approved = outcome.is_approved(), "payment processed");

        Ok(Some(NotificationRequested::from_outcome(&input, outcome)))
    }
}
