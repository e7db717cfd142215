//! listing-sync daemon entry point.
//!
//! Mounts the configured view scopes against the realtime hub and serves
//! the reconciled collections over a local HTTP read API.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use listing_sync::api;
use listing_sync::app_state::AppState;
use listing_sync::config::SyncConfig;
use listing_sync::credentials::{CredentialSource, SharedCredential};
use listing_sync::domain::ListingStore;
use listing_sync::service::{HttpMarketplaceClient, ListingSource, ModerationActions, SyncContext};
use listing_sync::ws::ConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = SyncConfig::from_env().context("loading configuration")?;
    tracing::info!(hub = %config.hub_url, api = %config.api_base_url, "starting listing-sync");

    // Credential slot and collaborators
    let credentials = SharedCredential::new(config.access_token.clone());
    let credential_source: Arc<dyn CredentialSource> = Arc::new(credentials);
    let client = Arc::new(
        HttpMarketplaceClient::new(
            config.api_base_url.clone(),
            Arc::clone(&credential_source),
            config.http_timeout,
        )
        .context("building marketplace client")?,
    );

    // Composition root
    let connections = Arc::new(ConnectionManager::new(
        config.channel_config(),
        credential_source,
    ));
    let store = Arc::new(ListingStore::new());
    let sync = SyncContext::new(connections, store).with_source(
        Arc::clone(&client) as Arc<dyn ListingSource>,
        config.refetch_on_reconnect,
    );

    // Mount views; sessions stay bound until shutdown
    let mut sessions = Vec::with_capacity(config.scopes.len());
    for scope in &config.scopes {
        sessions.push(sync.acquire(*scope).await);
    }
    tracing::info!(scopes = ?config.scopes, "views mounted");

    let app_state = AppState {
        sync,
        actions: Some(client as Arc<dyn ModerationActions>),
    };

    // Build router
    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "read api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    for session in sessions {
        session.release();
    }
    Ok(())
}
