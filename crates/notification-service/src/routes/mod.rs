//! HTTP route handlers.

pub mod notifications;
