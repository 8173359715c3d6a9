//! Long-running service tasks built on [`BrokerSession`].

use std::sync::Arc;

use broker::{Broker, Consumer, Producer};
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionMonitor;
use crate::pipeline::{MessageHandler, MessagePipeline};
use crate::publisher::{EventPublisher, PublisherSlot};
use crate::retry::RetryPolicy;
use crate::session::{AttachPlan, BrokerSession, Subscription};

/// Why the consume loop stopped.
enum LoopExit {
    Shutdown,
    SessionLost(String),
}

/// A consume → transform → publish service.
///
/// [`run`](Self::run) attaches, feeds every inbound message through a
/// [`MessagePipeline`] strictly one at a time, and reattaches whenever the
/// session is lost, until shutdown.
pub struct ConsumerService<B: Broker, H: MessageHandler> {
    session: BrokerSession<B>,
    plan: AttachPlan,
    handler: Arc<H>,
}

impl<B: Broker, H: MessageHandler> ConsumerService<B, H> {
    /// Creates a service that consumes `subscription` and publishes what
    /// `handler` returns.
    pub fn new(
        broker: B,
        service: impl Into<String>,
        subscription: Subscription,
        handler: Arc<H>,
    ) -> Self {
        Self {
            session: BrokerSession::new(broker, service),
            plan: AttachPlan::consumer(subscription).with_producer(),
            handler,
        }
    }

    /// Skips the producer handle for handlers that never publish.
    pub fn without_producer(mut self) -> Self {
        self.plan.produces = false;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.session = self.session.with_retry(retry);
        self
    }

    pub fn monitor(&self) -> ConnectionMonitor {
        self.session.monitor().clone()
    }

    /// Runs until `shutdown` is cancelled, then releases every broker handle.
    pub async fn run(self, shutdown: CancellationToken) {
        let service = self.session.client_id().to_string();
        tracing::info!(%service, "consumer service starting");

        loop {
            let Some(mut attachment) = self.session.attach(&self.plan, &shutdown).await else {
                break;
            };

            let publisher = attachment
                .producer
                .as_ref()
                .map(|producer| EventPublisher::new(Arc::clone(producer), service.clone()));
            let pipeline = MessagePipeline::new(service.clone(), Arc::clone(&self.handler), publisher);

            let exit = match attachment.consumer.as_mut() {
                Some(consumer) => consume(consumer, &pipeline, &shutdown).await,
                None => LoopExit::SessionLost("no consumer attached".to_string()),
            };

            match exit {
                LoopExit::Shutdown => {
                    self.session.shutdown(Some(attachment)).await;
                    break;
                }
                LoopExit::SessionLost(reason) => {
                    self.session.session_lost(attachment, &reason).await;
                }
            }
        }

        tracing::info!(%service, "consumer service stopped");
    }
}

/// Fetches and dispatches messages sequentially. Shutdown abandons the
/// message in flight.
async fn consume<C, H, P>(
    consumer: &mut C,
    pipeline: &MessagePipeline<H, P>,
    shutdown: &CancellationToken,
) -> LoopExit
where
    C: Consumer,
    H: MessageHandler,
    P: Producer,
{
    loop {
        let step = async {
            match consumer.next_message().await {
                Ok(Some(message)) => {
                    pipeline.dispatch(&message).await;
                    None
                }
                Ok(None) => Some(LoopExit::SessionLost("consumer closed".to_string())),
                Err(e) => Some(LoopExit::SessionLost(e.to_string())),
            }
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return LoopExit::Shutdown,
            exit = step => {
                if let Some(exit) = exit {
                    return exit;
                }
            }
        }
    }
}

/// A publish-only service.
///
/// [`run`](Self::run) attaches a producer and exposes it through a
/// [`PublisherSlot`]. When a caller reports the session lost, the slot stays
/// empty until the producer is reattached.
pub struct ProducerService<B: Broker> {
    session: BrokerSession<B>,
    slot: PublisherSlot<B::Producer>,
}

impl<B: Broker> ProducerService<B> {
    pub fn new(broker: B, service: impl Into<String>) -> Self {
        Self {
            session: BrokerSession::new(broker, service),
            slot: PublisherSlot::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.session = self.session.with_retry(retry);
        self
    }

    pub fn monitor(&self) -> ConnectionMonitor {
        self.session.monitor().clone()
    }

    /// Slot filled with the publisher while attached.
    pub fn publisher(&self) -> PublisherSlot<B::Producer> {
        self.slot.clone()
    }

    /// Runs until `shutdown` is cancelled, then empties the slot and
    /// releases the producer.
    pub async fn run(self, shutdown: CancellationToken) {
        let service = self.session.client_id().to_string();
        tracing::info!(%service, "producer service starting");
        let plan = AttachPlan::producer();

        loop {
            let Some(attachment) = self.session.attach(&plan, &shutdown).await else {
                break;
            };
            if let Some(producer) = &attachment.producer {
                self.slot
                    .set(Some(EventPublisher::new(Arc::clone(producer), service.clone())))
                    .await;
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.slot.set(None).await;
                    self.session.shutdown(Some(attachment)).await;
                    break;
                }
                _ = self.slot.lost() => {
                    self.session
                        .session_lost(attachment, "publish failed with a connectivity error")
                        .await;
                }
            }
        }

        tracing::info!(%service, "producer service stopped");
    }
}
