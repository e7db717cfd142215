//! Connection manager for the shared realtime channel.
//!
//! [`ConnectionManager`] owns at most one [`RealtimeChannel`] per process,
//! created lazily on first access and never recreated. The channel runs a
//! background task that connects, pumps frames into its
//! [`EventDispatcher`], and reconnects on loss following the
//! [`ReconnectPolicy`] table.
//!
//! # States
//!
//! ```text
//!  NotStarted ──ensure_started──▶ Connecting ──ok──▶ Connected
//!       ▲                            │  ▲                │
//!       │ (no runtime)          fail │  └──── drop ──────┘
//!       └────────────────────────────┤   (reconnect loop, policy table)
//!                                    ▼
//!                              Disconnected ──start retry delay──▶ ensure_started
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::watch;

use super::dispatcher::EventDispatcher;
use super::messages::decode_frame;
use super::policy::ReconnectPolicy;
use super::transport::{DEFAULT_KEEPALIVE_INTERVAL, Frame, FrameStream, Transport, WsTransport};
use crate::credentials::CredentialSource;
use crate::error::SyncError;

/// Default fallback delay before retrying a failed start.
pub const DEFAULT_START_RETRY_DELAY: Duration = Duration::from_millis(1_500);

/// Default silence after which a connection is considered dead.
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No start has been attempted.
    NotStarted,
    /// A start or reconnect is in progress.
    Connecting,
    /// Connected and delivering events.
    Connected,
    /// The last start attempt failed; a retry is scheduled.
    Disconnected,
}

/// Static settings of the realtime channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Realtime endpoint URL.
    pub endpoint: String,
    /// Reconnection delay table used after an established connection drops.
    pub reconnect_policy: ReconnectPolicy,
    /// Fixed delay before retrying a start that failed.
    pub start_retry_delay: Duration,
    /// Longest silence (no frame, ping or pong) tolerated on an open
    /// connection before it is dropped and reconnected.
    pub server_timeout: Duration,
    /// Interval between client pings.
    pub keepalive_interval: Duration,
}

impl ChannelConfig {
    /// Creates a config with the default policy and start retry delay.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_policy: ReconnectPolicy::default(),
            start_retry_delay: DEFAULT_START_RETRY_DELAY,
            server_timeout: DEFAULT_SERVER_TIMEOUT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

/// Owner of the process-wide realtime channel.
///
/// Constructed by the composition root and shared behind an `Arc`. The
/// channel itself is built on the first call to [`Self::channel`].
#[derive(Debug)]
pub struct ConnectionManager {
    config: ChannelConfig,
    credentials: Arc<dyn CredentialSource>,
    transport: Arc<dyn Transport>,
    channel: OnceLock<RealtimeChannel>,
}

impl ConnectionManager {
    /// Creates a manager using the WebSocket transport.
    #[must_use]
    pub fn new(config: ChannelConfig, credentials: Arc<dyn CredentialSource>) -> Self {
        let transport = WsTransport::new(config.keepalive_interval);
        Self::with_transport(config, credentials, Arc::new(transport))
    }

    /// Creates a manager with an explicit transport.
    #[must_use]
    pub fn with_transport(
        config: ChannelConfig,
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            credentials,
            transport,
            channel: OnceLock::new(),
        }
    }

    /// Returns the shared channel, constructing it on first call.
    pub fn channel(&self) -> &RealtimeChannel {
        self.channel.get_or_init(|| {
            tracing::debug!(endpoint = %self.config.endpoint, "creating realtime channel");
            RealtimeChannel::new(
                self.config.clone(),
                Arc::clone(&self.credentials),
                Arc::clone(&self.transport),
            )
        })
    }

    /// Idempotently starts the shared channel. See
    /// [`RealtimeChannel::ensure_started`].
    pub fn ensure_started(&self) {
        self.channel().ensure_started();
    }

    /// Current state; `NotStarted` if the channel was never created.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.channel
            .get()
            .map_or(ConnectionState::NotStarted, RealtimeChannel::state)
    }
}

/// Handle to the shared realtime channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
}

#[derive(Debug)]
struct ChannelInner {
    config: ChannelConfig,
    credentials: Arc<dyn CredentialSource>,
    transport: Arc<dyn Transport>,
    dispatcher: EventDispatcher,
    state: watch::Sender<ConnectionState>,
    epoch: AtomicU64,
}

impl RealtimeChannel {
    fn new(
        config: ChannelConfig,
        credentials: Arc<dyn CredentialSource>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::NotStarted);
        Self {
            inner: Arc::new(ChannelInner {
                config,
                credentials,
                transport,
                dispatcher: EventDispatcher::new(),
                state,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Handler table of this channel.
    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }

    /// Realtime endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.config.endpoint
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver notified on every state transition.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Number of successful connections so far (0 before the first).
    #[must_use]
    pub fn connection_epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::Acquire)
    }

    /// Starts the channel unless it is already connecting or connected.
    ///
    /// Returns immediately. The transition to `Connecting` is claimed
    /// atomically, so concurrent callers never open two connections. A
    /// failed start is retried once after the start retry delay; errors
    /// are logged, never returned. Outside a Tokio runtime the attempt is
    /// abandoned and the state reverts to `NotStarted`.
    pub fn ensure_started(&self) {
        let claimed = self.inner.state.send_if_modified(|state| match state {
            ConnectionState::NotStarted | ConnectionState::Disconnected => {
                *state = ConnectionState::Connecting;
                true
            }
            ConnectionState::Connecting | ConnectionState::Connected => false,
        });
        if !claimed {
            tracing::trace!(state = ?self.state(), "realtime channel already starting or started");
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("ensure_started called outside a tokio runtime");
            self.inner.state.send_replace(ConnectionState::NotStarted);
            return;
        };
        runtime.spawn(run_channel(Arc::clone(&self.inner)));
    }
}

impl ChannelInner {
    async fn open(&self) -> Result<FrameStream, SyncError> {
        let credential = self.credentials.get();
        self.transport
            .connect(&self.config.endpoint, credential.as_deref())
            .await
    }

    fn mark_connected(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        self.state.send_replace(ConnectionState::Connected);
        tracing::info!(endpoint = %self.config.endpoint, epoch, "realtime channel connected");
    }

    /// Delivers frames until the connection ends, breaks, or stays silent
    /// for longer than the server timeout.
    async fn pump(&self, mut frames: FrameStream) {
        let idle_limit = self.config.server_timeout;
        loop {
            let Ok(next) = tokio::time::timeout(idle_limit, frames.next()).await else {
                tracing::warn!(
                    endpoint = %self.config.endpoint,
                    timeout_ms = u64::try_from(idle_limit.as_millis()).unwrap_or(u64::MAX),
                    "no traffic from server within timeout; dropping connection"
                );
                return;
            };
            let Some(frame) = next else {
                break;
            };
            let text = match frame {
                Ok(Frame::Text(text)) => text,
                Ok(Frame::Keepalive) => continue,
                Err(err) => {
                    tracing::warn!(error = %err, "realtime channel read failed");
                    return;
                }
            };
            for decoded in decode_frame(&text) {
                match decoded {
                    Ok(event) => {
                        let handled = self.dispatcher.dispatch(&event);
                        tracing::trace!(
                            event = %event.name(),
                            listing_id = %event.listing_id(),
                            handled,
                            "realtime event dispatched"
                        );
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping undecodable realtime message");
                    }
                }
            }
        }
        tracing::info!(endpoint = %self.config.endpoint, "realtime channel closed");
    }

    /// Reconnects following the policy table until a connection opens.
    async fn reconnect(&self) -> FrameStream {
        let mut attempt: u32 = 0;
        loop {
            let delay = self.config.reconnect_policy.delay_for(attempt);
            tracing::info!(
                attempt = attempt.saturating_add(1),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "reconnecting realtime channel"
            );
            tokio::time::sleep(delay).await;
            match self.open().await {
                Ok(frames) => return frames,
                Err(err) => {
                    tracing::warn!(error = %err, attempt = attempt.saturating_add(1), "reconnect attempt failed");
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}

async fn run_channel(inner: Arc<ChannelInner>) {
    let mut frames = match inner.open().await {
        Ok(frames) => frames,
        Err(err) => {
            let delay = inner.config.start_retry_delay;
            tracing::warn!(
                error = %err,
                retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "realtime channel failed to start"
            );
            inner.state.send_replace(ConnectionState::Disconnected);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                RealtimeChannel { inner }.ensure_started();
            });
            return;
        }
    };

    loop {
        inner.mark_connected();
        inner.pump(frames).await;
        // events pushed while reconnecting are lost; consumers may refetch
        inner.state.send_replace(ConnectionState::Connecting);
        frames = inner.reconnect().await;
    }
}
