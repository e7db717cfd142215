//! Listing collection handlers: paginated snapshots and moderation actions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::api::dto::{FeedFilter, PaginationParams};
use crate::app_state::AppState;
use crate::domain::{ListingId, OwnerSubmission};
use crate::error::SyncError;

/// Body of an accepted moderation action.
#[derive(Debug, Serialize)]
struct ActionAccepted {
    id: ListingId,
    action: &'static str,
}

/// `GET /feed` — Public feed, newest first, narrowed by [`FeedFilter`].
pub async fn list_feed(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<FeedFilter>,
) -> impl IntoResponse {
    let snapshot = state.sync.store().feed().snapshot();
    Json(params.paginate(&filter.apply(&snapshot)))
}

/// `GET /feed/{id}` — One listing from the public feed.
///
/// # Errors
///
/// Returns [`SyncError::ListingNotFound`] if the feed has no such listing.
pub async fn get_feed_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, SyncError> {
    let id = ListingId::new(id);
    state
        .sync
        .store()
        .feed()
        .get(id)
        .map(Json)
        .ok_or(SyncError::ListingNotFound(id))
}

/// `GET /moderation-queue` — Listings awaiting moderation, newest first.
pub async fn list_queue(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let snapshot = state.sync.store().queue().snapshot();
    Json(params.paginate(&snapshot))
}

/// `GET /my-listings` — The owner's submissions with their status, most
/// recently created first.
pub async fn list_owner_submissions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let snapshot = state.sync.store().owner_submissions().snapshot();
    Json(params.paginate(&newest_first(&snapshot)))
}

/// Stable sort by creation time, descending.
fn newest_first(items: &[OwnerSubmission]) -> Vec<OwnerSubmission> {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| {
        b.listing
            .listing
            .created_at
            .cmp(&a.listing.listing.created_at)
    });
    sorted
}

/// `POST /moderation-queue/{id}/approve` — Approve a queued listing.
///
/// # Errors
///
/// Returns [`SyncError::ActionsUnavailable`] without an action collaborator,
/// or the collaborator's error.
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, SyncError> {
    let id = ListingId::new(id);
    let actions = state.actions.as_ref().ok_or(SyncError::ActionsUnavailable)?;
    actions.approve(id).await?;
    Ok(accepted(&state, id, "approve"))
}

/// `POST /moderation-queue/{id}/reject` — Reject a queued listing.
///
/// # Errors
///
/// Returns [`SyncError::ActionsUnavailable`] without an action collaborator,
/// or the collaborator's error.
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, SyncError> {
    let id = ListingId::new(id);
    let actions = state.actions.as_ref().ok_or(SyncError::ActionsUnavailable)?;
    actions.reject(id).await?;
    Ok(accepted(&state, id, "reject"))
}

/// Optimistically drops the listing from the local queue. Advisory only:
/// the realtime removal event is authoritative and idempotent.
fn accepted(
    state: &AppState,
    id: ListingId,
    action: &'static str,
) -> (StatusCode, Json<ActionAccepted>) {
    state.sync.store().remove_queue_item(id);
    tracing::info!(listing_id = %id, action, "moderation action accepted");
    (StatusCode::ACCEPTED, Json(ActionAccepted { id, action }))
}

/// Listing routes, mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(list_feed))
        .route("/feed/{id}", get(get_feed_item))
        .route("/moderation-queue", get(list_queue))
        .route("/moderation-queue/{id}/approve", post(approve))
        .route("/moderation-queue/{id}/reject", post(reject))
        .route("/my-listings", get(list_owner_submissions))
}
