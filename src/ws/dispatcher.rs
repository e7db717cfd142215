//! Named event → handler binding table on the shared channel.
//!
//! Bindings are keyed by ([`BindingOwner`], [`EventName`]). Every facade
//! binds under its own owner token, so two mounted views never clobber each
//! other's handlers, and binding a name again for the same owner replaces
//! the previous handler instead of stacking a second one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::{EventName, RealtimeEvent};

/// Callback invoked for each delivered event.
pub type Handler = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

/// Identity of one set of bindings (one mounted facade).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingOwner(uuid::Uuid);

impl BindingOwner {
    /// Creates a fresh owner token.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for BindingOwner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A mapping from event name to handler, applied with
/// [`EventDispatcher::bind`].
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<EventName, Handler>,
}

impl HandlerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the handler for `name`.
    #[must_use]
    pub fn on<F>(mut self, name: EventName, handler: F) -> Self
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    /// Event names present in the table.
    #[must_use]
    pub fn names(&self) -> Vec<EventName> {
        self.handlers.keys().copied().collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("names", &self.names())
            .finish()
    }
}

type Bindings = HashMap<EventName, Vec<(BindingOwner, Handler)>>;

/// Handler table of the shared realtime channel.
///
/// Cloning yields another handle to the same table. The dispatcher can only
/// bind and unbind; it holds no reference to the connection.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    bindings: Arc<RwLock<Bindings>>,
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds every entry of `table` for `owner`.
    ///
    /// A name already bound for `owner` is unbound first, so a push never
    /// fires the same owner's handler twice.
    pub fn bind(&self, owner: BindingOwner, table: HandlerTable) {
        let mut bindings = self.bindings.write();
        for (name, handler) in table.handlers {
            let slot = bindings.entry(name).or_default();
            if slot.iter().any(|(bound, _)| *bound == owner) {
                tracing::debug!(%owner, event = %name, "replacing existing binding");
                slot.retain(|(bound, _)| *bound != owner);
            }
            slot.push((owner, handler));
        }
    }

    /// Removes `owner`'s handlers for each of `names`. Names not bound for
    /// `owner` are ignored.
    pub fn unbind_all(&self, owner: BindingOwner, names: &[EventName]) {
        let mut bindings = self.bindings.write();
        for name in names {
            if let Some(slot) = bindings.get_mut(name) {
                slot.retain(|(bound, _)| *bound != owner);
                if slot.is_empty() {
                    bindings.remove(name);
                }
            }
        }
    }

    /// Invokes every handler bound to the event's name, in bind order.
    ///
    /// Handlers run after the table lock is released, so a handler may
    /// bind or unbind without deadlocking. Returns the number of handlers
    /// invoked.
    pub fn dispatch(&self, event: &RealtimeEvent) -> usize {
        let name = event.name();
        let handlers: Vec<Handler> = self
            .bindings
            .read()
            .get(&name)
            .map(|slot| slot.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        if handlers.is_empty() {
            tracing::trace!(event = %name, "no handler bound");
        }
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of handlers currently bound to `name`.
    #[must_use]
    pub fn handler_count(&self, name: EventName) -> usize {
        self.bindings.read().get(&name).map_or(0, Vec::len)
    }

    /// Returns `true` if `owner` has a handler bound to `name`.
    #[must_use]
    pub fn is_bound(&self, owner: BindingOwner, name: EventName) -> bool {
        self.bindings
            .read()
            .get(&name)
            .is_some_and(|slot| slot.iter().any(|(bound, _)| *bound == owner))
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings = self.bindings.read();
        let counts: HashMap<EventName, usize> = bindings
            .iter()
            .map(|(name, slot)| (*name, slot.len()))
            .collect();
        f.debug_struct("EventDispatcher")
            .field("bindings", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::domain::{ListingId, ListingRef};

    fn removal(id: u64) -> RealtimeEvent {
        RealtimeEvent::ListingApprovedForModerators(ListingRef {
            id: ListingId::new(id),
        })
    }

    fn counting_table(counter: &Arc<AtomicUsize>) -> HandlerTable {
        let counter = Arc::clone(counter);
        HandlerTable::new().on(EventName::ListingApprovedForModerators, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn bind_unbind_bind_fires_exactly_once() {
        let dispatcher = EventDispatcher::new();
        let owner = BindingOwner::new();
        let counter = Arc::new(AtomicUsize::new(0));

        dispatcher.bind(owner, counting_table(&counter));
        dispatcher.unbind_all(owner, &EventName::ALL);
        dispatcher.bind(owner, counting_table(&counter));

        assert_eq!(dispatcher.dispatch(&removal(1)), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_bind_replaces_handler() {
        let dispatcher = EventDispatcher::new();
        let owner = BindingOwner::new();
        let counter = Arc::new(AtomicUsize::new(0));

        dispatcher.bind(owner, counting_table(&counter));
        dispatcher.bind(owner, counting_table(&counter));

        dispatcher.dispatch(&removal(1));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(
            dispatcher.handler_count(EventName::ListingApprovedForModerators),
            1
        );
    }

    #[test]
    fn owners_are_independent() {
        let dispatcher = EventDispatcher::new();
        let feed_view = BindingOwner::new();
        let admin_view = BindingOwner::new();
        let counter = Arc::new(AtomicUsize::new(0));

        dispatcher.bind(feed_view, counting_table(&counter));
        dispatcher.bind(admin_view, counting_table(&counter));
        dispatcher.dispatch(&removal(1));
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        dispatcher.unbind_all(feed_view, &EventName::ALL);
        assert!(!dispatcher.is_bound(feed_view, EventName::ListingApprovedForModerators));
        assert!(dispatcher.is_bound(admin_view, EventName::ListingApprovedForModerators));

        dispatcher.dispatch(&removal(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn unbound_names_are_not_routed() {
        let dispatcher = EventDispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));
        dispatcher.bind(BindingOwner::new(), counting_table(&counter));

        let other = RealtimeEvent::ListingRejectedForModerators(ListingRef {
            id: ListingId::new(1),
        });
        assert_eq!(dispatcher.dispatch(&other), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unbind_of_unknown_owner_is_noop() {
        let dispatcher = EventDispatcher::new();
        let counter = Arc::new(AtomicUsize::new(0));
        dispatcher.bind(BindingOwner::new(), counting_table(&counter));
        dispatcher.unbind_all(BindingOwner::new(), &EventName::ALL);
        assert_eq!(
            dispatcher.handler_count(EventName::ListingApprovedForModerators),
            1
        );
    }

    #[test]
    fn handler_may_unbind_during_dispatch() {
        let dispatcher = EventDispatcher::new();
        let owner = BindingOwner::new();
        let inner = dispatcher.clone();
        let table = HandlerTable::new().on(EventName::ListingApprovedForModerators, move |_| {
            inner.unbind_all(owner, &EventName::ALL);
        });
        dispatcher.bind(owner, table);

        assert_eq!(dispatcher.dispatch(&removal(1)), 1);
        assert_eq!(dispatcher.dispatch(&removal(1)), 0);
    }
}
