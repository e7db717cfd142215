//! Request/response collaborators of the sync core.
//!
//! [`ListingSource`] seeds (and after a reconnect, repairs) a collection
//! with the server's full current contents. [`ModerationActions`] issues
//! approve/reject calls whose authoritative outcome arrives later over the
//! realtime channel. [`HttpMarketplaceClient`] implements both with
//! `reqwest`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::credentials::CredentialSource;
use crate::domain::{ListingId, OwnerSubmission, PrivilegedListing, PublicListing};
use crate::error::SyncError;

/// Bulk fetch of collection contents.
#[async_trait]
pub trait ListingSource: Send + Sync + fmt::Debug {
    /// Approved listings for the public feed, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails.
    async fn fetch_feed(&self) -> Result<Vec<PublicListing>, SyncError>;

    /// Listings awaiting moderation, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails.
    async fn fetch_moderation_queue(&self) -> Result<Vec<PrivilegedListing>, SyncError>;

    /// The signed-in owner's submissions.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails.
    async fn fetch_owner_submissions(&self) -> Result<Vec<OwnerSubmission>, SyncError>;
}

/// Moderation actions; fire-and-forget from the core's perspective.
#[async_trait]
pub trait ModerationActions: Send + Sync + fmt::Debug {
    /// Approves a queued listing.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails.
    async fn approve(&self, id: ListingId) -> Result<(), SyncError>;

    /// Rejects a queued listing.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the request fails.
    async fn reject(&self, id: ListingId) -> Result<(), SyncError>;
}

const FEED_PATH: &str = "/api/ads";
const QUEUE_PATH: &str = "/api/carads/pending";
const OWNER_PATH: &str = "/api/ads/mine";

/// HTTP client for the marketplace REST API.
#[derive(Debug, Clone)]
pub struct HttpMarketplaceClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpMarketplaceClient {
    /// Creates a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Http`] if the underlying client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SyncError> {
        let url = self.url(path);
        let response = self.authorize(self.http.get(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn post_empty(&self, path: &str) -> Result<(), SyncError> {
        let url = self.url(path);
        let response = self.authorize(self.http.post(&url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        tracing::debug!(%url, "moderation action accepted");
        Ok(())
    }
}

#[async_trait]
impl ListingSource for HttpMarketplaceClient {
    async fn fetch_feed(&self) -> Result<Vec<PublicListing>, SyncError> {
        self.get_json(FEED_PATH).await
    }

    async fn fetch_moderation_queue(&self) -> Result<Vec<PrivilegedListing>, SyncError> {
        self.get_json(QUEUE_PATH).await
    }

    async fn fetch_owner_submissions(&self) -> Result<Vec<OwnerSubmission>, SyncError> {
        self.get_json(OWNER_PATH).await
    }
}

#[async_trait]
impl ModerationActions for HttpMarketplaceClient {
    async fn approve(&self, id: ListingId) -> Result<(), SyncError> {
        self.post_empty(&format!("/api/carads/{id}/approve")).await
    }

    async fn reject(&self, id: ListingId) -> Result<(), SyncError> {
        self.post_empty(&format!("/api/carads/{id}/reject")).await
    }
}
