//! Listing records and their public / privileged projections.
//!
//! A listing has one numeric identity shared by every projection: the
//! [`PublicListing`] visible to any visitor, the [`PrivilegedListing`]
//! seen by moderators (adds chassis number and owner id), and the
//! [`OwnerSubmission`] seen by the submitting owner (adds a status).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Numeric listing identifier, immutable and unique within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(u64);

impl ListingId {
    /// Wraps a raw numeric id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ListingId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Anything stored in a reconciliation collection: keyed by [`ListingId`].
pub trait Keyed {
    /// Returns the listing id used for deduplication.
    fn id(&self) -> ListingId;
}

/// Listing category. Encoded on the wire as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Category {
    /// Used vehicle for sale.
    UsedSale,
    /// Cooperative (installment) sale.
    CoopSale,
    /// Buyer looking for a vehicle.
    BuyRequest,
    /// Brand new (zero-kilometer) vehicle.
    ZeroSale,
}

impl Category {
    /// Display label, matched by free-text feed search.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::UsedSale => "used",
            Self::CoopSale => "cooperative",
            Self::BuyRequest => "buy request",
            Self::ZeroSale => "zero km",
        }
    }
}

impl TryFrom<u8> for Category {
    type Error = SyncError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::UsedSale),
            2 => Ok(Self::CoopSale),
            3 => Ok(Self::BuyRequest),
            4 => Ok(Self::ZeroSale),
            other => Err(SyncError::InvalidPayload(format!(
                "unknown listing category {other}"
            ))),
        }
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> Self {
        match category {
            Category::UsedSale => 1,
            Category::CoopSale => 2,
            Category::BuyRequest => 3,
            Category::ZeroSale => 4,
        }
    }
}

/// Transmission tag. Encoded on the wire as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Transmission {
    /// Not specified.
    None,
    /// Automatic gearbox.
    Automatic,
    /// Manual gearbox.
    Manual,
}

impl Transmission {
    /// Display label, matched by free-text feed search. Empty when unset.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }
}

impl TryFrom<u8> for Transmission {
    type Error = SyncError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::None),
            1 => Ok(Self::Automatic),
            2 => Ok(Self::Manual),
            other => Err(SyncError::InvalidPayload(format!(
                "unknown transmission {other}"
            ))),
        }
    }
}

impl From<Transmission> for u8 {
    fn from(transmission: Transmission) -> Self {
        match transmission {
            Transmission::None => 0,
            Transmission::Automatic => 1,
            Transmission::Manual => 2,
        }
    }
}

/// Asking price. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    /// Creates a price.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPayload`] if `value` is not finite or
    /// not strictly positive.
    pub fn new(value: f64) -> Result<Self, SyncError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(SyncError::InvalidPayload(format!(
                "price must be positive, got {value}"
            )))
        }
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Price {
    type Error = SyncError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// Moderation status of an owner's submission.
///
/// Monotonic in practice (never back to `Pending`), but the store accepts
/// whatever the server asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    /// Awaiting moderation.
    Pending,
    /// Approved and visible in the public feed.
    Approved,
    /// Rejected by a moderator.
    Rejected,
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        };
        f.write_str(s)
    }
}

/// Fields visible to any visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicListing {
    /// Listing identifier.
    pub id: ListingId,
    /// Listing category.
    #[serde(rename = "type")]
    pub category: Category,
    /// Display title.
    pub title: String,
    /// Model year.
    pub year: u16,
    /// Exterior color.
    pub color: String,
    /// Usage counter in kilometers.
    pub mileage_km: u64,
    /// Asking price.
    pub price: Price,
    /// Transmission tag.
    #[serde(rename = "gearbox")]
    pub transmission: Transmission,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Keyed for PublicListing {
    fn id(&self) -> ListingId {
        self.id
    }
}

/// Public fields plus the vehicle identification string and owner id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivilegedListing {
    /// The public projection of the same listing.
    #[serde(flatten)]
    pub listing: PublicListing,
    /// Vehicle identification (chassis) number.
    pub chassis_number: String,
    /// Id of the submitting owner.
    pub user_id: u64,
}

impl PrivilegedListing {
    /// Returns the public projection of this listing.
    #[must_use]
    pub fn to_public(&self) -> PublicListing {
        self.listing.clone()
    }
}

impl Keyed for PrivilegedListing {
    fn id(&self) -> ListingId {
        self.listing.id
    }
}

/// A privileged record as seen by its owner, with moderation status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerSubmission {
    /// The privileged projection.
    #[serde(flatten)]
    pub listing: PrivilegedListing,
    /// Current moderation status.
    pub status: ListingStatus,
}

impl OwnerSubmission {
    /// Returns a copy with `status` replaced and every other field intact.
    #[must_use]
    pub fn with_status(&self, status: ListingStatus) -> Self {
        Self {
            listing: self.listing.clone(),
            status,
        }
    }
}

impl Keyed for OwnerSubmission {
    fn id(&self) -> ListingId {
        self.listing.id()
    }
}
