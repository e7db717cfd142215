//! Local read API: store snapshots and moderation actions over HTTP.
//!
//! This is the "UI re-read" surface: every list endpoint serves the
//! current snapshot of one reconciled collection. All resource endpoints
//! are mounted under `/api/v1`.

pub mod dto;
pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}
