//! Event choreography core shared by every service in the chain.
//!
//! A service attaches to the broker through a [`BrokerSession`], which owns
//! its [`ConnectionMonitor`] state machine and retries attachment forever at
//! a fixed interval. Consuming services then feed each inbound message
//! through a [`MessagePipeline`] (decode → handle → encode → publish), one
//! message at a time, isolating failures to the message that caused them.
//!
//! - [`ConsumerService`] drives a consume/transform/publish service.
//! - [`ProducerService`] keeps a publish-only service attached.
//! - [`http`] exposes the connection state as a health probe.

pub mod connection;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod publisher;
pub mod retry;
pub mod service;
pub mod session;

pub use connection::{ConnectionEvent, ConnectionMonitor, ConnectionState};
pub use error::{CapabilityError, ConnectionError, PipelineError, PipelineStage, PublishError};
pub use http::service_router;
pub use pipeline::{MessageHandler, MessagePipeline, NoEvent, Processed};
pub use publisher::{EventPublisher, PublisherSlot};
pub use retry::RetryPolicy;
pub use service::{ConsumerService, ProducerService};
pub use session::{AttachPlan, Attachment, BrokerSession, Subscription};
