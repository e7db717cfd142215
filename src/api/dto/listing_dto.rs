//! Feed search parameters for `GET /feed`.

use serde::Deserialize;

use crate::domain::{Category, PublicListing, Transmission};

/// Narrows the public feed. Absent fields match everything; ranges are
/// inclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedFilter {
    /// Case-insensitive text matched against title, color, year and the
    /// category and gearbox labels.
    #[serde(default)]
    pub q: Option<String>,
    /// Category wire code (1-4).
    #[serde(default, rename = "type")]
    pub category: Option<Category>,
    /// Gearbox wire code (0-2).
    #[serde(default)]
    pub gearbox: Option<Transmission>,
    /// Earliest model year.
    #[serde(default)]
    pub year_from: Option<u16>,
    /// Latest model year.
    #[serde(default)]
    pub year_to: Option<u16>,
    /// Lowest price.
    #[serde(default)]
    pub price_from: Option<f64>,
    /// Highest price.
    #[serde(default)]
    pub price_to: Option<f64>,
}

impl FeedFilter {
    /// Returns whether `listing` passes every given criterion.
    #[must_use]
    pub fn matches(&self, listing: &PublicListing) -> bool {
        if self.category.is_some_and(|c| c != listing.category)
            || self.gearbox.is_some_and(|g| g != listing.transmission)
            || self.year_from.is_some_and(|y| listing.year < y)
            || self.year_to.is_some_and(|y| listing.year > y)
        {
            return false;
        }
        let price = listing.price.get();
        if self.price_from.is_some_and(|p| price < p) || self.price_to.is_some_and(|p| price > p) {
            return false;
        }
        let needle = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);
        let Some(needle) = needle else {
            return true;
        };
        let haystack = format!(
            "{} {} {} {} {}",
            listing.title,
            listing.color,
            listing.year,
            listing.transmission.label(),
            listing.category.label()
        )
        .to_lowercase();
        haystack.contains(&needle)
    }

    /// Keeps the matching listings, preserving order.
    #[must_use]
    pub fn apply(&self, listings: &[PublicListing]) -> Vec<PublicListing> {
        listings
            .iter()
            .filter(|listing| self.matches(listing))
            .cloned()
            .collect()
    }
}
