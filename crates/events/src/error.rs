use common::OrderId;
use thiserror::Error;

/// Errors raised when an event violates its contract.
#[derive(Debug, Error)]
pub enum EventError {
    /// A payment outcome whose success flag disagrees with its metadata.
    #[error(
        "Inconsistent payment outcome for order {order_id}: success={success}, transactionId present={has_transaction}, errorMessage present={has_error}"
    )]
    InconsistentOutcome {
        order_id: OrderId,
        success: bool,
        has_transaction: bool,
        has_error: bool,
    },

    /// The order ID is empty.
    #[error("Event is missing its order ID")]
    MissingOrderId,
}
