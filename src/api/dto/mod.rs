//! Data transfer objects for the local read API.

pub mod common_dto;
pub mod listing_dto;

pub use common_dto::{Page, PaginationMeta, PaginationParams};
pub use listing_dto::FeedFilter;
