//! Local read API served in-process against a hand-populated store.

#![allow(clippy::panic)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use listing_sync::api::build_router;
use listing_sync::app_state::AppState;
use listing_sync::credentials::SharedCredential;
use listing_sync::domain::{
    Category, ListingId, ListingStatus, ListingStore, OwnerSubmission, Price, PrivilegedListing,
    PublicListing, Transmission,
};
use listing_sync::error::SyncError;
use listing_sync::service::{ModerationActions, SyncContext};
use listing_sync::ws::{ChannelConfig, ConnectionManager};

#[derive(Debug, Default)]
struct RecordingActions {
    calls: Mutex<Vec<(&'static str, ListingId)>>,
}

#[async_trait]
impl ModerationActions for RecordingActions {
    async fn approve(&self, id: ListingId) -> Result<(), SyncError> {
        self.calls.lock().push(("approve", id));
        Ok(())
    }

    async fn reject(&self, id: ListingId) -> Result<(), SyncError> {
        self.calls.lock().push(("reject", id));
        Err(SyncError::UnexpectedStatus {
            status: 403,
            url: format!("/api/carads/{id}/reject"),
        })
    }
}

/// Odd ids are used automatics in red; even ids are zero-km manuals in
/// blue. Year and price grow with the id.
fn listing(id: u64) -> PublicListing {
    let odd = id % 2 == 1;
    let Ok(price) = Price::new(1_000.0 * id as f64) else {
        panic!("valid price rejected");
    };
    PublicListing {
        id: ListingId::new(id),
        category: if odd { Category::UsedSale } else { Category::ZeroSale },
        title: format!("Listing {id}"),
        year: 2010 + u16::try_from(id).unwrap_or(0),
        color: if odd { "red" } else { "blue" }.to_string(),
        mileage_km: 80_000,
        price,
        transmission: if odd { Transmission::Automatic } else { Transmission::Manual },
        created_at: created_on(1),
    }
}

fn created_on(day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

fn submission(id: u64, day: u32) -> OwnerSubmission {
    let mut listing = queued(id);
    listing.listing.created_at = created_on(day);
    OwnerSubmission {
        listing,
        status: ListingStatus::Pending,
    }
}

fn queued(id: u64) -> PrivilegedListing {
    PrivilegedListing {
        listing: listing(id),
        chassis_number: format!("VIN{id:05}"),
        user_id: 11,
    }
}

fn state(actions: Option<Arc<dyn ModerationActions>>) -> AppState {
    // Never started: these tests only read the store.
    let connections = Arc::new(ConnectionManager::new(
        ChannelConfig::new("ws://127.0.0.1:9/hubs/listings"),
        Arc::new(SharedCredential::default()),
    ));
    let store = Arc::new(ListingStore::new());
    for id in 1..=5 {
        store.insert_feed_item(listing(id));
    }
    store.insert_queue_item(queued(20));
    store.insert_queue_item(queued(21));
    store.replace_owner_collection(vec![submission(31, 1), submission(32, 3), submission(33, 2)]);
    AppState {
        sync: SyncContext::new(connections, store),
        actions,
    }
}

async fn send(state: AppState, method: &str, uri: &str) -> Response {
    let Ok(request) = Request::builder().method(method).uri(uri).body(Body::empty()) else {
        panic!("bad request");
    };
    let Ok(response) = build_router().with_state(state).oneshot(request).await else {
        panic!("router failed");
    };
    response
}

async fn json_body(response: Response) -> Value {
    let bytes = tokio_test::assert_ok!(to_bytes(response.into_body(), usize::MAX).await);
    tokio_test::assert_ok!(serde_json::from_slice(&bytes))
}

fn ids(page: &Value) -> Vec<u64> {
    page["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["id"].as_u64()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn feed_is_paginated_newest_first() {
    let response = send(state(None), "GET", "/api/v1/feed?page=2&per_page=2").await;
    assert_eq!(response.status(), StatusCode::OK);

    let page = json_body(response).await;
    assert_eq!(ids(&page), vec![3, 2]);
    assert_eq!(page["pagination"]["total"], 5);
    assert_eq!(page["pagination"]["total_pages"], 3);
}

#[tokio::test]
async fn feed_item_lookup() {
    let response = send(state(None), "GET", "/api/v1/feed/4").await;
    assert_eq!(response.status(), StatusCode::OK);
    let item = json_body(response).await;
    assert_eq!(item["id"], 4);
    assert_eq!(item["type"], 4);
    assert_eq!(item["gearbox"], 2);

    let response = send(state(None), "GET", "/api/v1/feed/99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], 2001);
}

#[tokio::test]
async fn feed_filters_by_codes_and_ranges() {
    let page = json_body(send(state(None), "GET", "/api/v1/feed?type=1&gearbox=1").await).await;
    assert_eq!(ids(&page), vec![5, 3, 1]);

    let page = json_body(send(state(None), "GET", "/api/v1/feed?year_from=2012&year_to=2014").await).await;
    assert_eq!(ids(&page), vec![4, 3, 2]);

    let page = json_body(send(state(None), "GET", "/api/v1/feed?price_from=2000&price_to=3000").await).await;
    assert_eq!(ids(&page), vec![3, 2]);
}

#[tokio::test]
async fn feed_text_search_and_pagination_apply_after_filtering() {
    let page = json_body(send(state(None), "GET", "/api/v1/feed?q=BLUE").await).await;
    assert_eq!(ids(&page), vec![4, 2]);

    let page = json_body(send(state(None), "GET", "/api/v1/feed?q=manual").await).await;
    assert_eq!(ids(&page), vec![4, 2]);

    let page = json_body(send(state(None), "GET", "/api/v1/feed?q=2015").await).await;
    assert_eq!(ids(&page), vec![5]);

    let page =
        json_body(send(state(None), "GET", "/api/v1/feed?type=1&page=2&per_page=2").await).await;
    assert_eq!(ids(&page), vec![1]);
    assert_eq!(page["pagination"]["total"], 3);
}

#[tokio::test]
async fn unknown_category_code_is_rejected() {
    let response = send(state(None), "GET", "/api/v1/feed?type=9").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_listings_are_newest_first() {
    let page = json_body(send(state(None), "GET", "/api/v1/my-listings").await).await;
    assert_eq!(ids(&page), vec![32, 33, 31]);
    assert_eq!(page["data"][0]["status"], "Pending");
}

#[tokio::test]
async fn queue_exposes_privileged_fields() {
    let response = send(state(None), "GET", "/api/v1/moderation-queue").await;
    let page = json_body(response).await;
    assert_eq!(ids(&page), vec![21, 20]);
    assert_eq!(page["data"][0]["chassisNumber"], "VIN00021");
}

#[tokio::test]
async fn moderation_without_actions_is_unavailable() {
    let response = send(state(None), "POST", "/api/v1/moderation-queue/20/approve").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn approve_is_forwarded_and_drops_the_local_entry() {
    let actions = Arc::new(RecordingActions::default());
    let app_state = state(Some(Arc::clone(&actions) as Arc<dyn ModerationActions>));
    let store = Arc::clone(app_state.sync.store());

    let response = send(app_state, "POST", "/api/v1/moderation-queue/20/approve").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(*actions.calls.lock(), vec![("approve", ListingId::new(20))]);
    assert!(!store.queue().contains(ListingId::new(20)));
    assert!(store.queue().contains(ListingId::new(21)));
}

#[tokio::test]
async fn failed_reject_keeps_the_local_entry() {
    let actions = Arc::new(RecordingActions::default());
    let app_state = state(Some(Arc::clone(&actions) as Arc<dyn ModerationActions>));
    let store = Arc::clone(app_state.sync.store());

    let response = send(app_state, "POST", "/api/v1/moderation-queue/21/reject").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(store.queue().contains(ListingId::new(21)));
}

#[tokio::test]
async fn health_reports_degraded_before_the_channel_starts() {
    let response = send(state(None), "GET", "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
}
