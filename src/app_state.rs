//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{ModerationActions, SyncContext};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Realtime sync wiring; handlers read store snapshots through it.
    pub sync: SyncContext,
    /// Moderation action collaborator, if configured.
    pub actions: Option<Arc<dyn ModerationActions>>,
}
