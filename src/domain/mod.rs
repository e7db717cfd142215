//! Domain layer: listing records, realtime events and the reconciliation
//! store.
//!
//! This module holds the client-side model: the listing projections shared
//! by the three audiences, the closed set of server-pushed events, and the
//! three ordered collections those events reconcile.

pub mod listing;
pub mod realtime_event;
pub mod store;

pub use listing::{
    Category, Keyed, ListingId, ListingStatus, OwnerSubmission, Price, PrivilegedListing,
    PublicListing, Transmission,
};
pub use realtime_event::{EventName, ListingRef, RealtimeEvent, StatusChange};
pub use store::{Collection, ListingStore, Snapshot};
