//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::intake::IntakeError;

/// Reasons an order request is rejected before anything is published.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("customerId is required")]
    MissingCustomerId,

    #[error("items must be a non-empty array")]
    MissingItems,

    #[error("item {index} has quantity 0")]
    InvalidQuantity { index: usize },

    #[error("item {index} subtotal is too large")]
    SubtotalOverflow { index: usize },

    #[error("totalAmount is required and must be non-zero")]
    MissingTotal,
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or incomplete order data.
    BadRequest(String),
    /// The producer is not attached to the broker.
    Unavailable,
    /// Publishing failed after the order was accepted.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(details) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "Invalid order data", "details": details }),
            ),
            ApiError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": "Service unavailable, broker connection not established"
                }),
            ),
            ApiError::Internal(details) => {
                tracing::error!(error = %details, "failed to process order");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": "Failed to process order", "details": details }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::Unavailable => ApiError::Unavailable,
            IntakeError::Publish { .. } => ApiError::Internal(err.to_string()),
        }
    }
}
