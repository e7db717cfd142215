//! System endpoints: health and sync status.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::app_state::AppState;
use crate::ws::ConnectionState;

/// Sizes of the three collections.
#[derive(Debug, Serialize)]
struct CollectionSizes {
    feed: usize,
    moderation_queue: usize,
    my_listings: usize,
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    connection: ConnectionState,
    collections: CollectionSizes,
}

/// `GET /health` — Service health and realtime channel state.
///
/// Always 200: a disconnected channel degrades to `"degraded"` rather
/// than failing, since the channel heals itself.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connection = state.sync.connections().state();
    let store = state.sync.store();
    let status = match connection {
        ConnectionState::Connected => "healthy",
        ConnectionState::NotStarted
        | ConnectionState::Connecting
        | ConnectionState::Disconnected => "degraded",
    };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            connection,
            collections: CollectionSizes {
                feed: store.feed().len(),
                moderation_queue: store.queue().len(),
                my_listings: store.owner_submissions().len(),
            },
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
