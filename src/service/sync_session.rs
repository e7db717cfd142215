//! Synchronization facade: the composition root of the realtime core.
//!
//! [`SyncContext`] owns the shared pieces (connection manager, store,
//! optional bulk-fetch source). [`SyncSession`] is the scoped resource a
//! view acquires on mount: acquisition starts the channel and binds the
//! store-mutating handlers; dropping (or [`SyncSession::release`]) unbinds
//! them. The channel itself outlives every session.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::domain::{EventName, ListingStore, RealtimeEvent};
use crate::error::SyncError;
use crate::service::listing_source::ListingSource;
use crate::ws::{BindingOwner, ConnectionManager, ConnectionState, HandlerTable, RealtimeChannel};

/// Which collection a mounted view is seeded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewScope {
    /// Public feed of approved listings.
    PublicFeed,
    /// Moderators' queue of pending listings.
    Moderation,
    /// The signed-in owner's submissions.
    OwnerSubmissions,
}

impl ViewScope {
    /// Returns the configuration name of this scope.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PublicFeed => "feed",
            Self::Moderation => "moderation",
            Self::OwnerSubmissions => "mine",
        }
    }
}

impl fmt::Display for ViewScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewScope {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" | "public" => Ok(Self::PublicFeed),
            "moderation" | "queue" | "admin" => Ok(Self::Moderation),
            "mine" | "owner" => Ok(Self::OwnerSubmissions),
            other => Err(SyncError::InvalidConfig(format!("unknown view scope: {other}"))),
        }
    }
}

/// Shared wiring handed to every view.
#[derive(Debug, Clone)]
pub struct SyncContext {
    connections: Arc<ConnectionManager>,
    store: Arc<ListingStore>,
    source: Option<Arc<dyn ListingSource>>,
    refetch_on_reconnect: bool,
}

impl SyncContext {
    /// Creates a context without a bulk-fetch source.
    #[must_use]
    pub fn new(connections: Arc<ConnectionManager>, store: Arc<ListingStore>) -> Self {
        Self {
            connections,
            store,
            source: None,
            refetch_on_reconnect: false,
        }
    }

    /// Attaches a bulk-fetch source used to seed collections on acquire
    /// and, if `refetch_on_reconnect`, to repair them after a reconnect.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ListingSource>, refetch_on_reconnect: bool) -> Self {
        self.source = Some(source);
        self.refetch_on_reconnect = refetch_on_reconnect;
        self
    }

    /// The shared listing store.
    #[must_use]
    pub fn store(&self) -> &Arc<ListingStore> {
        &self.store
    }

    /// The connection manager.
    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// Mounts a view: starts the channel, binds the store handlers, then
    /// seeds the scope's collection from the source (if any).
    ///
    /// Events delivered while the seed fetch is in flight are replayed onto
    /// the fetched snapshot, so the replace never discards them.
    ///
    /// Never fails: seed errors are logged and the collection keeps
    /// whatever the realtime channel delivers.
    pub async fn acquire(&self, scope: ViewScope) -> SyncSession {
        let channel = self.connections.channel().clone();
        self.connections.ensure_started();

        let owner = BindingOwner::new();
        let replay = ReplayLog::default();
        if self.source.is_some() {
            replay.begin();
        }
        channel
            .dispatcher()
            .bind(owner, store_handlers(&self.store, &replay));
        tracing::debug!(%owner, %scope, "sync session bound");

        let mut refetch_task = None;
        if let Some(source) = &self.source {
            let seeded_epoch = channel.connection_epoch();
            if let Err(err) = replay.refresh(&self.store, source.as_ref(), scope).await {
                tracing::warn!(error = %err, %scope, "initial bulk fetch failed");
            }
            if self.refetch_on_reconnect {
                refetch_task = Some(spawn_refetch_on_reconnect(
                    &channel,
                    RefetchTarget {
                        store: Arc::clone(&self.store),
                        source: Arc::clone(source),
                        replay: replay.clone(),
                        scope,
                    },
                    seeded_epoch,
                ));
            }
        }

        SyncSession {
            owner,
            scope,
            channel,
            refetch_task,
            released: false,
        }
    }
}

/// A mounted view's handler bindings. Unbinds on drop.
#[derive(Debug)]
pub struct SyncSession {
    owner: BindingOwner,
    scope: ViewScope,
    channel: RealtimeChannel,
    refetch_task: Option<JoinHandle<()>>,
    released: bool,
}

impl SyncSession {
    /// Owner token under which this session's handlers are bound.
    #[must_use]
    pub fn owner(&self) -> BindingOwner {
        self.owner
    }

    /// Scope this session was acquired for.
    #[must_use]
    pub fn scope(&self) -> ViewScope {
        self.scope
    }

    /// State of the shared channel.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    /// Unmounts the view. Equivalent to dropping the session.
    pub fn release(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.channel
            .dispatcher()
            .unbind_all(self.owner, &EventName::ALL);
        if let Some(task) = self.refetch_task.take() {
            task.abort();
        }
        tracing::debug!(owner = %self.owner, scope = %self.scope, "sync session released");
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Events a session saw while one of its bulk fetches was in flight.
///
/// `None` when no fetch is running. A fetch replaces its collection
/// wholesale, so anything applied in the meantime is re-applied on top of
/// the fetched snapshot; the store's idempotent operations absorb events
/// the snapshot already reflects.
#[derive(Debug, Clone, Default)]
struct ReplayLog {
    pending: Arc<Mutex<Option<Vec<RealtimeEvent>>>>,
}

impl ReplayLog {
    fn begin(&self) {
        self.pending.lock().get_or_insert_with(Vec::new);
    }

    fn record(&self, event: &RealtimeEvent) {
        if let Some(events) = self.pending.lock().as_mut() {
            events.push(event.clone());
        }
    }

    async fn refresh(
        &self,
        store: &ListingStore,
        source: &dyn ListingSource,
        scope: ViewScope,
    ) -> Result<(), SyncError> {
        self.begin();
        let result = refresh(store, source, scope).await;
        let events = self.pending.lock().take().unwrap_or_default();
        if result.is_ok() && !events.is_empty() {
            let changed = events.iter().filter(|event| store.apply(event)).count();
            tracing::debug!(%scope, replayed = events.len(), changed, "replayed events seen during fetch");
        }
        result
    }
}

/// One handler per event name, each routing into [`ListingStore::apply`].
fn store_handlers(store: &Arc<ListingStore>, replay: &ReplayLog) -> HandlerTable {
    EventName::ALL
        .into_iter()
        .fold(HandlerTable::new(), |table, name| {
            let store = Arc::clone(store);
            let replay = replay.clone();
            table.on(name, move |event: &RealtimeEvent| {
                store.apply(event);
                replay.record(event);
            })
        })
}

/// Replaces the scope's collection with the source's current contents.
///
/// # Errors
///
/// Returns the source's [`SyncError`]; the collection is left untouched.
pub async fn refresh(
    store: &ListingStore,
    source: &dyn ListingSource,
    scope: ViewScope,
) -> Result<(), SyncError> {
    let count = match scope {
        ViewScope::PublicFeed => {
            let items = source.fetch_feed().await?;
            let count = items.len();
            store.replace_feed(items);
            count
        }
        ViewScope::Moderation => {
            let items = source.fetch_moderation_queue().await?;
            let count = items.len();
            store.replace_queue(items);
            count
        }
        ViewScope::OwnerSubmissions => {
            let items = source.fetch_owner_submissions().await?;
            let count = items.len();
            store.replace_owner_collection(items);
            count
        }
    };
    tracing::info!(%scope, count, "collection refreshed from bulk fetch");
    Ok(())
}

/// What a refetch task refreshes.
#[derive(Debug)]
struct RefetchTarget {
    store: Arc<ListingStore>,
    source: Arc<dyn ListingSource>,
    replay: ReplayLog,
    scope: ViewScope,
}

/// Re-runs the bulk fetch whenever the channel is connected under a newer
/// epoch than the last fetch started at. `seeded_epoch` is the epoch the
/// seed fetch started at; events pushed before that connection was up were
/// never delivered, so the first connection after a seed counts too.
fn spawn_refetch_on_reconnect(
    channel: &RealtimeChannel,
    target: RefetchTarget,
    seeded_epoch: u64,
) -> JoinHandle<()> {
    let mut states = channel.subscribe_state();
    let channel = channel.clone();
    tokio::spawn(async move {
        let RefetchTarget {
            store,
            source,
            replay,
            scope,
        } = target;
        let mut refreshed_epoch = seeded_epoch;
        loop {
            let connected = *states.borrow_and_update() == ConnectionState::Connected;
            let epoch = channel.connection_epoch();
            if connected && epoch > refreshed_epoch {
                refreshed_epoch = epoch;
                tracing::info!(%scope, epoch, "connected since last fetch; refetching to repair gap");
                if let Err(err) = replay.refresh(&store, source.as_ref(), scope).await {
                    tracing::warn!(error = %err, %scope, "refetch after reconnect failed");
                }
                continue;
            }
            if states.changed().await.is_err() {
                break;
            }
        }
    })
}
