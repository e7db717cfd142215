//! Transport seam for the realtime channel.
//!
//! [`Transport`] opens one connection and yields its frames as a
//! stream. [`WsTransport`] is the production WebSocket implementation over
//! `tokio-tungstenite`; tests substitute scripted transports.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;

use crate::error::SyncError;

/// Default interval between client pings.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// One item read from a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload holding one or more framed messages.
    Text(String),
    /// Ping or pong. Carries no events but proves the peer is alive.
    Keepalive,
}

/// Frames received on one connection. The stream ends when the connection
/// closes; an `Err` item means the connection broke.
pub type FrameStream = BoxStream<'static, Result<Frame, SyncError>>;

/// Opens connections to the realtime endpoint.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Connects to `endpoint`, presenting `credential` as a bearer token
    /// when one is available.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Transport`] if the connection cannot be opened.
    async fn connect(
        &self,
        endpoint: &str,
        credential: Option<&str>,
    ) -> Result<FrameStream, SyncError>;
}

/// WebSocket transport. Pings the server every `keepalive_interval` so an
/// idle but healthy connection still produces pong traffic.
#[derive(Debug, Clone, Copy)]
pub struct WsTransport {
    keepalive_interval: Duration,
}

impl WsTransport {
    /// Creates a transport pinging at `keepalive_interval` (at least 1 ms).
    #[must_use]
    pub fn new(keepalive_interval: Duration) -> Self {
        Self {
            keepalive_interval: keepalive_interval.max(Duration::from_millis(1)),
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(DEFAULT_KEEPALIVE_INTERVAL)
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(
        &self,
        endpoint: &str,
        credential: Option<&str>,
    ) -> Result<FrameStream, SyncError> {
        let mut request = endpoint
            .into_client_request()
            .map_err(|e| SyncError::Transport(format!("invalid endpoint {endpoint}: {e}")))?;

        if let Some(token) = credential {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| SyncError::Transport(format!("invalid credential header: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| SyncError::Transport(format!("connect {endpoint}: {e}")))?;

        tracing::debug!(endpoint, "websocket handshake complete");

        let period = self.keepalive_interval;
        let pings = interval_at(Instant::now() + period, period);

        // The stream owns the socket: dropping it closes the connection.
        let frames = stream::unfold((socket, pings), |(mut socket, mut pings)| async move {
            loop {
                tokio::select! {
                    message = socket.next() => {
                        let item = match message? {
                            Ok(Message::Text(text)) => Ok(Frame::Text(text.as_str().to_owned())),
                            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                                Ok(text) => Ok(Frame::Text(text)),
                                Err(_) => {
                                    tracing::warn!("dropping non-utf8 binary frame");
                                    continue;
                                }
                            },
                            Ok(Message::Ping(_) | Message::Pong(_)) => Ok(Frame::Keepalive),
                            Ok(Message::Close(frame)) => {
                                tracing::debug!(?frame, "server closed realtime channel");
                                return None;
                            }
                            Ok(Message::Frame(_)) => continue,
                            Err(e) => Err(SyncError::Transport(format!("read: {e}"))),
                        };
                        return Some((item, (socket, pings)));
                    }
                    _ = pings.tick() => {
                        if let Err(e) = socket.send(Message::Ping(Default::default())).await {
                            let item = Err(SyncError::Transport(format!("keepalive: {e}")));
                            return Some((item, (socket, pings)));
                        }
                    }
                }
            }
        });

        Ok(frames.boxed())
    }
}
