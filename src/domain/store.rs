//! Reconciliation store: the three client-side listing collections.
//!
//! Each [`Collection`] is an ordered, newest-first list keyed by
//! [`ListingId`]. Mutations are idempotent and copy-on-write: every change
//! publishes a freshly built `Arc<Vec<T>>` through a
//! [`tokio::sync::watch`] channel, so a snapshot a reader holds is never
//! modified underneath it, and observers wake only on real changes.

use std::sync::Arc;

use tokio::sync::watch;

use super::listing::{Keyed, ListingId, OwnerSubmission, PrivilegedListing, PublicListing};
use super::realtime_event::{RealtimeEvent, StatusChange};

/// Immutable view of a collection at one point in time.
pub type Snapshot<T> = Arc<Vec<T>>;

/// An ordered, id-deduplicated collection with observable snapshots.
#[derive(Debug)]
pub struct Collection<T> {
    tx: watch::Sender<Snapshot<T>>,
}

impl<T: Keyed + Clone> Collection<T> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(Vec::new()));
        Self { tx }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<T> {
        Arc::clone(&self.tx.borrow())
    }

    /// Returns a receiver notified whenever the collection changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.tx.subscribe()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    /// Returns `true` if the collection has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Returns `true` if an entry with `id` is present.
    #[must_use]
    pub fn contains(&self, id: ListingId) -> bool {
        self.tx.borrow().iter().any(|item| item.id() == id)
    }

    /// Returns a copy of the entry with `id`, if present.
    #[must_use]
    pub fn get(&self, id: ListingId) -> Option<T> {
        self.tx.borrow().iter().find(|item| item.id() == id).cloned()
    }

    /// Dedup-prepend: inserts `item` at the head unless its id is present.
    ///
    /// Returns `true` if the collection changed.
    pub fn prepend_if_absent(&self, item: T) -> bool {
        self.tx.send_if_modified(|current| {
            let id = item.id();
            if current.iter().any(|existing| existing.id() == id) {
                return false;
            }
            let mut next = Vec::with_capacity(current.len().saturating_add(1));
            next.push(item);
            next.extend(current.iter().cloned());
            *current = Arc::new(next);
            true
        })
    }

    /// Removes the entry with `id`. Absent ids are a no-op.
    ///
    /// Returns `true` if the collection changed.
    pub fn remove(&self, id: ListingId) -> bool {
        self.tx.send_if_modified(|current| {
            if !current.iter().any(|item| item.id() == id) {
                return false;
            }
            let next: Vec<T> = current
                .iter()
                .filter(|item| item.id() != id)
                .cloned()
                .collect();
            *current = Arc::new(next);
            true
        })
    }

    /// Replaces the whole collection, preserving the given order.
    pub fn replace(&self, items: Vec<T>) {
        self.tx.send_replace(Arc::new(items));
    }

    /// Replaces the entry with `id` by `update(entry)`. Absent ids are a
    /// no-op.
    ///
    /// Returns `true` if the collection changed.
    pub fn update(&self, id: ListingId, update: impl FnOnce(&T) -> T) -> bool {
        self.tx.send_if_modified(|current| {
            let Some(position) = current.iter().position(|item| item.id() == id) else {
                return false;
            };
            let mut next: Vec<T> = current.to_vec();
            if let Some(slot) = next.get_mut(position) {
                *slot = update(&*slot);
            }
            *current = Arc::new(next);
            true
        })
    }
}

impl<T: Keyed + Clone> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The public feed, the moderation queue and the owner's submissions.
#[derive(Debug, Default)]
pub struct ListingStore {
    feed: Collection<PublicListing>,
    queue: Collection<PrivilegedListing>,
    owner_submissions: Collection<OwnerSubmission>,
}

impl ListingStore {
    /// Creates a store with three empty collections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Public feed collection.
    #[must_use]
    pub fn feed(&self) -> &Collection<PublicListing> {
        &self.feed
    }

    /// Moderation queue collection.
    #[must_use]
    pub fn queue(&self) -> &Collection<PrivilegedListing> {
        &self.queue
    }

    /// Owner submission collection.
    #[must_use]
    pub fn owner_submissions(&self) -> &Collection<OwnerSubmission> {
        &self.owner_submissions
    }

    /// Prepends a listing to the public feed unless already present.
    pub fn insert_feed_item(&self, item: PublicListing) -> bool {
        let id = item.id;
        let inserted = self.feed.prepend_if_absent(item);
        if !inserted {
            tracing::debug!(listing_id = %id, "feed already contains listing");
        }
        inserted
    }

    /// Prepends a listing to the moderation queue unless already present.
    pub fn insert_queue_item(&self, item: PrivilegedListing) -> bool {
        let id = item.id();
        let inserted = self.queue.prepend_if_absent(item);
        if !inserted {
            tracing::debug!(listing_id = %id, "moderation queue already contains listing");
        }
        inserted
    }

    /// Removes a listing from the moderation queue; absent ids are a no-op.
    pub fn remove_queue_item(&self, id: ListingId) -> bool {
        let removed = self.queue.remove(id);
        if !removed {
            tracing::trace!(listing_id = %id, "listing not in moderation queue");
        }
        removed
    }

    /// Full replace of the public feed (bulk fetch only).
    pub fn replace_feed(&self, items: Vec<PublicListing>) {
        self.feed.replace(items);
    }

    /// Full replace of the moderation queue (bulk fetch only).
    pub fn replace_queue(&self, items: Vec<PrivilegedListing>) {
        self.queue.replace(items);
    }

    /// Full replace of the owner's submissions (bulk fetch only).
    pub fn replace_owner_collection(&self, items: Vec<OwnerSubmission>) {
        self.owner_submissions.replace(items);
    }

    /// Replaces the status of the matching owner submission.
    ///
    /// Only the status field changes. An unknown id is a no-op.
    pub fn apply_status_change(&self, change: &StatusChange) -> bool {
        let status = change.status;
        let updated = self
            .owner_submissions
            .update(change.listing_id, |item| item.with_status(status));
        if updated {
            tracing::debug!(listing_id = %change.listing_id, %status, "owner submission status updated");
        } else {
            tracing::trace!(listing_id = %change.listing_id, "status change for unknown listing");
        }
        updated
    }

    /// Routes a realtime event to its store operation.
    ///
    /// Returns `true` if any collection changed.
    pub fn apply(&self, event: &RealtimeEvent) -> bool {
        match event {
            RealtimeEvent::ListingApproved(listing) => self.insert_feed_item(listing.clone()),
            RealtimeEvent::ListingSubmitted(listing) => self.insert_queue_item(listing.clone()),
            RealtimeEvent::ListingApprovedForModerators(r)
            | RealtimeEvent::ListingRejectedForModerators(r) => self.remove_queue_item(r.id),
            RealtimeEvent::ListingStatusChanged(change) => self.apply_status_change(change),
        }
    }
}
