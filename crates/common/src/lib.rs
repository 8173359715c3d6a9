//! Shared types for the order-fulfillment choreography.
//!
//! Every service depends on this crate for the correlation key ([`OrderId`]),
//! monetary amounts ([`Money`]) and the broker topic and header names that make
//! up the wire contract between services.

pub mod money;
pub mod topics;
pub mod types;

pub use money::Money;
pub use types::OrderId;
