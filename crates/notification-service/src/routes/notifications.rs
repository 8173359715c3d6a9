//! Recent-deliveries diagnostics endpoint.

use axum::Json;
use axum::extract::State;
use events::DeliveryRecord;

use crate::history::DeliveryHistory;

/// GET /api/notifications: recent deliveries, oldest first.
pub async fn list(State(history): State<DeliveryHistory>) -> Json<Vec<DeliveryRecord>> {
    Json(history.snapshot().await)
}
