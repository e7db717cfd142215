//! Shared DTO types used across list endpoints.

use serde::{Deserialize, Serialize};

/// Pagination query parameters for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items.
    pub total: u32,
    /// Total number of pages.
    pub total_pages: u32,
}

/// One page of a collection snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items on this page, newest first.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PaginationParams {
    /// Clamps `page` to at least 1 and `per_page` to 1..=100.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, 100),
        }
    }

    /// Cuts one page out of `items`, preserving order.
    #[must_use]
    pub fn paginate<T: Clone>(&self, items: &[T]) -> Page<T> {
        let params = self.clamped();
        let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
        let total_pages = if total == 0 {
            0
        } else {
            total.div_ceil(params.per_page)
        };
        let start = usize::try_from(
            u64::from(params.page.saturating_sub(1)) * u64::from(params.per_page),
        )
        .unwrap_or(usize::MAX);
        let data = items
            .iter()
            .skip(start)
            .take(usize::try_from(params.per_page).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Page {
            data,
            pagination: PaginationMeta {
                page: params.page,
                per_page: params.per_page,
                total,
                total_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        let params = PaginationParams {
            page: 0,
            per_page: 1_000,
        }
        .clamped();
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
    }

    #[test]
    fn paginates_in_order() {
        let items: Vec<u32> = (1..=45).collect();
        let page = PaginationParams {
            page: 3,
            per_page: 20,
        }
        .paginate(&items);
        assert_eq!(page.data, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.pagination.total, 45);
        assert_eq!(page.pagination.total_pages, 3);
    }

    #[test]
    fn empty_collection_has_no_pages() {
        let page = PaginationParams::default().paginate::<u32>(&[]);
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total_pages, 0);
    }
}
