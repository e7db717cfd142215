//! Server-pushed realtime events.
//!
//! The five event payload shapes are modeled as one closed sum type,
//! [`RealtimeEvent`], so that routing an event to a store operation is an
//! exhaustive `match` rather than a lookup on loosely typed JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::listing::{ListingId, ListingStatus, PrivilegedListing, PublicListing};
use crate::error::SyncError;

/// Names of the events the server pushes over the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventName {
    /// A listing became publicly visible.
    ListingApproved,
    /// A listing entered the moderation queue.
    ListingSubmitted,
    /// A queued listing was approved (moderator audience).
    ListingApprovedForModerators,
    /// A queued listing was rejected (moderator audience).
    ListingRejectedForModerators,
    /// The status of an owner's listing changed.
    ListingStatusChanged,
}

impl EventName {
    /// Every recognized event name.
    pub const ALL: [Self; 5] = [
        Self::ListingApproved,
        Self::ListingSubmitted,
        Self::ListingApprovedForModerators,
        Self::ListingRejectedForModerators,
        Self::ListingStatusChanged,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ListingApproved => "listing-approved",
            Self::ListingSubmitted => "listing-submitted",
            Self::ListingApprovedForModerators => "listing-approved-for-moderators",
            Self::ListingRejectedForModerators => "listing-rejected-for-moderators",
            Self::ListingStatusChanged => "listing-status-changed",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventName {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SyncError::InvalidPayload(format!("unknown event name: {s}")))
    }
}

/// Payload carrying only a listing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRef {
    /// Referenced listing.
    pub id: ListingId,
}

/// Status transition of an owner's listing.
///
/// Not a full record: it can only mutate an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    /// Listing whose status changed.
    #[serde(alias = "adId")]
    pub listing_id: ListingId,
    /// New status.
    pub status: ListingStatus,
    /// Approval instant, if approved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    /// Rejection instant, if rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
}

/// A decoded server → client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    /// Insert into the public feed.
    ListingApproved(PublicListing),
    /// Insert into the moderation queue.
    ListingSubmitted(PrivilegedListing),
    /// Remove from the moderation queue.
    ListingApprovedForModerators(ListingRef),
    /// Remove from the moderation queue.
    ListingRejectedForModerators(ListingRef),
    /// Update status in the owner's submissions.
    ListingStatusChanged(StatusChange),
}

impl RealtimeEvent {
    /// Returns the event's name, used as the dispatcher routing key.
    #[must_use]
    pub const fn name(&self) -> EventName {
        match self {
            Self::ListingApproved(_) => EventName::ListingApproved,
            Self::ListingSubmitted(_) => EventName::ListingSubmitted,
            Self::ListingApprovedForModerators(_) => EventName::ListingApprovedForModerators,
            Self::ListingRejectedForModerators(_) => EventName::ListingRejectedForModerators,
            Self::ListingStatusChanged(_) => EventName::ListingStatusChanged,
        }
    }

    /// Returns the id of the listing this event refers to.
    #[must_use]
    pub fn listing_id(&self) -> ListingId {
        match self {
            Self::ListingApproved(listing) => listing.id,
            Self::ListingSubmitted(listing) => listing.listing.id,
            Self::ListingApprovedForModerators(r) | Self::ListingRejectedForModerators(r) => r.id,
            Self::ListingStatusChanged(change) => change.listing_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::listing::tests::{privileged, public};

    #[test]
    fn names_round_trip_through_from_str() {
        for name in EventName::ALL {
            let Ok(parsed) = name.as_str().parse::<EventName>() else {
                panic!("{name} should parse");
            };
            assert_eq!(parsed, name);
        }
        assert!("CarAdApproved".parse::<EventName>().is_err());
    }

    #[test]
    fn serde_name_matches_wire_name() {
        for name in EventName::ALL {
            let json = serde_json::to_string(&name).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
        }
    }

    #[test]
    fn event_is_adjacently_tagged() {
        let event = RealtimeEvent::ListingApprovedForModerators(ListingRef {
            id: ListingId::new(10),
        });
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["event"], "listing-approved-for-moderators");
        assert_eq!(json["payload"]["id"], 10);
    }

    #[test]
    fn status_change_parses_optional_timestamps() {
        let raw = r#"{"event":"listing-status-changed","payload":{"listingId":5,"status":"Approved","approvedAt":"2024-06-01T12:00:00Z","rejectedAt":null}}"#;
        let Ok(RealtimeEvent::ListingStatusChanged(change)) = serde_json::from_str(raw) else {
            panic!("status change should parse");
        };
        assert_eq!(change.listing_id, ListingId::new(5));
        assert_eq!(change.status, ListingStatus::Approved);
        assert!(change.approved_at.is_some());
        assert!(change.rejected_at.is_none());
    }

    #[test]
    fn status_change_accepts_ad_id_key() {
        let raw = r#"{"event":"listing-status-changed","payload":{"adId":8,"status":"Rejected","approvedAt":null,"rejectedAt":"2024-06-02T08:30:00Z"}}"#;
        let Ok(RealtimeEvent::ListingStatusChanged(change)) = serde_json::from_str(raw) else {
            panic!("adId payload should parse");
        };
        assert_eq!(change.listing_id, ListingId::new(8));
        assert_eq!(change.status, ListingStatus::Rejected);
        assert!(change.rejected_at.is_some());
    }

    #[test]
    fn name_and_id_accessors_agree_with_payload() {
        let approved = RealtimeEvent::ListingApproved(public(1));
        assert_eq!(approved.name(), EventName::ListingApproved);
        assert_eq!(approved.listing_id(), ListingId::new(1));

        let submitted = RealtimeEvent::ListingSubmitted(privileged(2));
        assert_eq!(submitted.name(), EventName::ListingSubmitted);
        assert_eq!(submitted.listing_id(), ListingId::new(2));
    }
}
