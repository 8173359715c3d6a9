//! The per-message decode → transform → encode → publish pipeline.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use broker::{BrokerMessage, Producer, RecordMetadata};
use common::OrderId;
use events::{EventError, RoutedEvent};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{CapabilityError, PipelineError};
use crate::publisher::EventPublisher;

/// Domain step of a consuming service.
///
/// The pipeline decodes each message into `Input`, runs [`validate`] and
/// [`handle`], and publishes the returned `Output` keyed by its order ID.
///
/// [`validate`]: MessageHandler::validate
/// [`handle`]: MessageHandler::handle
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Inbound event shape.
    type Input: DeserializeOwned + RoutedEvent + 'static;

    /// Downstream event shape. Terminal handlers use [`NoEvent`].
    type Output: RoutedEvent + 'static;

    /// Checks contract rules that the decoded shape alone cannot express.
    /// A violation is treated like a decode failure.
    fn validate(&self, _input: &Self::Input) -> Result<(), EventError> {
        Ok(())
    }

    /// Invokes the domain capability.
    ///
    /// Negative business outcomes are returned as `Ok`; `Err` means the
    /// capability could not produce an outcome at all. `Ok(None)` ends the
    /// chain without a downstream event.
    async fn handle(&self, input: Self::Input) -> Result<Option<Self::Output>, CapabilityError>;
}

/// Output type of handlers that never publish.
#[derive(Debug, Serialize)]
pub enum NoEvent {}

impl RoutedEvent for NoEvent {
    fn topic(&self) -> &'static str {
        match *self {}
    }

    fn event_type(&self) -> &'static str {
        match *self {}
    }

    fn order_id(&self) -> &OrderId {
        match *self {}
    }
}

/// What happened to a successfully processed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// A downstream event was published.
    Published(RecordMetadata),
    /// The message was consumed without a downstream event.
    Consumed,
}

/// Runs messages through a [`MessageHandler`], one at a time.
pub struct MessagePipeline<H: MessageHandler, P: Producer> {
    service: String,
    handler: Arc<H>,
    publisher: Option<EventPublisher<P>>,
}

impl<H: MessageHandler, P: Producer> MessagePipeline<H, P> {
    pub fn new(
        service: impl Into<String>,
        handler: Arc<H>,
        publisher: Option<EventPublisher<P>>,
    ) -> Self {
        Self {
            service: service.into(),
            handler,
            publisher,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Runs all four stages for one message and reports the first failure.
    pub async fn process(&self, message: &BrokerMessage) -> Result<Processed, PipelineError> {
        let input: H::Input =
            serde_json::from_slice(&message.payload).map_err(PipelineError::Decode)?;
        self.handler.validate(&input)?;

        let started = Instant::now();
        let outcome = self.handler.handle(input).await;
        metrics::histogram!("capability_duration_seconds", "service" => self.service.clone())
            .record(started.elapsed().as_secs_f64());

        let Some(event) = outcome? else {
            return Ok(Processed::Consumed);
        };
        let publisher = self.publisher.as_ref().ok_or(PipelineError::NoProducer)?;
        let metadata = publisher.publish(&event).await?;
        Ok(Processed::Published(metadata))
    }

    /// Processes one message, logging and counting the result.
    ///
    /// Failures are confined to `message`: they are logged with its
    /// coordinates and `None` is returned so the caller moves on.
    #[tracing::instrument(
        name = "pipeline",
        skip(self, message),
        fields(
            service = %self.service,
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            order_id = %message.key
        )
    )]
    pub async fn dispatch(&self, message: &BrokerMessage) -> Option<Processed> {
        match self.process(message).await {
            Ok(processed) => {
                tracing::debug!(?processed, "message processed");
                metrics::counter!(
                    "pipeline_messages_total",
                    "service" => self.service.clone(),
                    "outcome" => "ok"
                )
                .increment(1);
                Some(processed)
            }
            Err(e) => {
                tracing::error!(stage = %e.stage(), error = %e, "message dropped");
                metrics::counter!(
                    "pipeline_messages_total",
                    "service" => self.service.clone(),
                    "outcome" => e.stage().as_str()
                )
                .increment(1);
                None
            }
        }
    }
}
