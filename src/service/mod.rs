//! Service layer: the synchronization facade and its request/response
//! collaborators.

pub mod listing_source;
pub mod sync_session;

pub use listing_source::{HttpMarketplaceClient, ListingSource, ModerationActions};
pub use sync_session::{SyncContext, SyncSession, ViewScope, refresh};
