//! Prometheus metrics endpoint

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::AppState;
use crate::metrics::{REGISTRY, USERS_TOTAL};

/// GET /metrics
///
/// Refreshes the user gauge from the datastore, then returns all
/// metrics in Prometheus text format. A failed count keeps the last value.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.db.count_users().await {
        Ok(count) => USERS_TOTAL.set(count),
        Err(error) => tracing::warn!(%error, "Failed to refresh user count"),
    }

    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&REGISTRY.gather()) {
        Ok(text) => (StatusCode::OK, [(CONTENT_TYPE, encoder.format_type())], text).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// Exposes the `/metrics` endpoint.
pub fn metrics_router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}
