//! Realtime wire framing.
//!
//! A text frame carries one or more JSON messages separated by the ASCII
//! record separator (`0x1E`). Each message is a [`RealtimeEvent`] encoded as
//! `{"event": "<name>", "payload": {...}}`.

use crate::domain::RealtimeEvent;
use crate::error::SyncError;

/// Message separator inside a frame.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Splits a frame into messages and decodes each one.
///
/// Empty segments are skipped. A message that fails to decode yields an
/// `Err` in its position without affecting the others.
#[must_use]
pub fn decode_frame(frame: &str) -> Vec<Result<RealtimeEvent, SyncError>> {
    frame
        .split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| serde_json::from_str::<RealtimeEvent>(segment).map_err(SyncError::from))
        .collect()
}

/// Encodes one event as a single-message frame, terminated by the record
/// separator.
///
/// # Errors
///
/// Returns [`SyncError::Decode`] if serialization fails.
pub fn encode_event(event: &RealtimeEvent) -> Result<String, SyncError> {
    let mut frame = serde_json::to_string(event)?;
    frame.push(RECORD_SEPARATOR);
    Ok(frame)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::listing::tests::public;
    use crate::domain::{EventName, ListingId, ListingRef};

    #[test]
    fn decodes_encoded_event() {
        let event = RealtimeEvent::ListingApproved(public(3));
        let Ok(frame) = encode_event(&event) else {
            panic!("encode failed");
        };
        let decoded = decode_frame(&frame);
        assert_eq!(decoded.len(), 1);
        let Some(Ok(first)) = decoded.into_iter().next() else {
            panic!("expected one decoded event");
        };
        assert_eq!(first, event);
    }

    #[test]
    fn plain_json_without_separator_is_accepted() {
        let frame = r#"{"event":"listing-rejected-for-moderators","payload":{"id":8}}"#;
        let decoded = decode_frame(frame);
        let Some(Ok(event)) = decoded.into_iter().next() else {
            panic!("expected event");
        };
        assert_eq!(event.name(), EventName::ListingRejectedForModerators);
        assert_eq!(event.listing_id(), ListingId::new(8));
    }

    #[test]
    fn bad_message_does_not_poison_frame() {
        let good = RealtimeEvent::ListingApprovedForModerators(ListingRef {
            id: ListingId::new(4),
        });
        let Ok(good_frame) = encode_event(&good) else {
            panic!("encode failed");
        };
        let frame = format!(
            "{{\"event\":\"listing-deleted\",\"payload\":{{}}}}{RECORD_SEPARATOR}{good_frame}"
        );
        let decoded = decode_frame(&frame);
        assert_eq!(decoded.len(), 2);
        assert!(decoded.first().is_some_and(Result::is_err));
        assert!(decoded.get(1).is_some_and(Result::is_ok));
    }

    #[test]
    fn empty_frame_decodes_to_nothing() {
        assert!(decode_frame("").is_empty());
        assert!(decode_frame("\u{1e}\u{1e}").is_empty());
    }
}
