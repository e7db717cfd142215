//! # listing-sync
//!
//! Realtime synchronization client for a moderated listings marketplace.
//!
//! Three audiences (visitors, owners, moderators) watch one shared,
//! continuously changing set of listings. This crate keeps three client-side
//! collections (public feed, moderation queue, owner's submissions)
//! consistent with the server over a single long-lived, auto-reconnecting
//! WebSocket, with idempotent reconciliation instead of polling.
//!
//! ## Architecture
//!
//! ```text
//! Server hub
//!     │  (WebSocket, bearer credential per connect)
//!     ├── ConnectionManager / RealtimeChannel (ws/)
//!     ├── EventDispatcher (ws/)
//!     │
//!     ├── SyncContext / SyncSession (service/)
//!     ├── ListingSource, ModerationActions (service/, REST)
//!     │
//!     ├── ListingStore (domain/)
//!     │
//!     └── Local read API (api/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
