//! Client configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::SyncError;
use crate::service::ViewScope;
use crate::ws::connection::{DEFAULT_SERVER_TIMEOUT, DEFAULT_START_RETRY_DELAY};
use crate::ws::policy::DEFAULT_RECONNECT_DELAYS_MS;
use crate::ws::transport::DEFAULT_KEEPALIVE_INTERVAL;
use crate::ws::{ChannelConfig, ReconnectPolicy};

/// Top-level client configuration.
///
/// Loaded once at startup via [`SyncConfig::from_env`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Socket address of the local read API (e.g. `127.0.0.1:3100`).
    pub listen_addr: SocketAddr,

    /// Realtime hub endpoint.
    pub hub_url: String,

    /// Base URL of the marketplace REST API.
    pub api_base_url: String,

    /// Initial bearer credential, if signed in.
    pub access_token: Option<String>,

    /// Reconnection delay table.
    pub reconnect_policy: ReconnectPolicy,

    /// Fixed delay before retrying a failed start.
    pub start_retry_delay: Duration,

    /// Silence after which an open connection is dropped and reconnected.
    pub server_timeout: Duration,

    /// Interval between client pings.
    pub keepalive_interval: Duration,

    /// Whether mounted scopes are refetched after a reconnect.
    pub refetch_on_reconnect: bool,

    /// View scopes the daemon mounts.
    pub scopes: Vec<ViewScope>,

    /// Timeout for REST requests.
    pub http_timeout: Duration,
}

impl SyncConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to defaults when a variable is not set; malformed
    /// numbers and booleans also fall back. Calls `dotenvy::dotenv().ok()`
    /// to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `LISTEN_ADDR` cannot be
    /// parsed, `RECONNECT_DELAYS_MS` is empty or malformed, or
    /// `SYNC_SCOPES` names an unknown scope, or `KEEPALIVE_INTERVAL_MS` is
    /// zero or not shorter than `SERVER_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, SyncError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3100".to_string())
            .parse()
            .map_err(|e| SyncError::InvalidConfig(format!("LISTEN_ADDR: {e}")))?;

        let hub_url = std::env::var("HUB_URL")
            .unwrap_or_else(|_| "ws://localhost:5000/hubs/listings".to_string());
        let api_base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
        let access_token = std::env::var("ACCESS_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());

        let reconnect_policy = match std::env::var("RECONNECT_DELAYS_MS") {
            Ok(raw) => ReconnectPolicy::from_millis(&parse_delay_list(&raw)?)?,
            Err(_) => ReconnectPolicy::from_millis(&DEFAULT_RECONNECT_DELAYS_MS)?,
        };

        let start_retry_delay = Duration::from_millis(parse_env(
            "START_RETRY_DELAY_MS",
            millis(DEFAULT_START_RETRY_DELAY),
        ));
        let server_timeout =
            Duration::from_millis(parse_env("SERVER_TIMEOUT_MS", millis(DEFAULT_SERVER_TIMEOUT)));
        let keepalive_interval = Duration::from_millis(parse_env(
            "KEEPALIVE_INTERVAL_MS",
            millis(DEFAULT_KEEPALIVE_INTERVAL),
        ));
        check_liveness(keepalive_interval, server_timeout)?;
        let refetch_on_reconnect = parse_env_bool("REFETCH_ON_RECONNECT", true);

        let scopes = match std::env::var("SYNC_SCOPES") {
            Ok(raw) => parse_scopes(&raw)?,
            Err(_) => vec![
                ViewScope::PublicFeed,
                ViewScope::Moderation,
                ViewScope::OwnerSubmissions,
            ],
        };

        let http_timeout = Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 10));

        Ok(Self {
            listen_addr,
            hub_url,
            api_base_url,
            access_token,
            reconnect_policy,
            start_retry_delay,
            server_timeout,
            keepalive_interval,
            refetch_on_reconnect,
            scopes,
            http_timeout,
        })
    }

    /// Builds the realtime channel settings.
    #[must_use]
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            endpoint: self.hub_url.clone(),
            reconnect_policy: self.reconnect_policy.clone(),
            start_retry_delay: self.start_retry_delay,
            server_timeout: self.server_timeout,
            keepalive_interval: self.keepalive_interval,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Pings must be sent often enough that a healthy idle connection never
/// reaches the server timeout.
fn check_liveness(keepalive: Duration, server_timeout: Duration) -> Result<(), SyncError> {
    if keepalive.is_zero() || keepalive >= server_timeout {
        return Err(SyncError::InvalidConfig(format!(
            "KEEPALIVE_INTERVAL_MS ({}) must be non-zero and below SERVER_TIMEOUT_MS ({})",
            millis(keepalive),
            millis(server_timeout)
        )));
    }
    Ok(())
}

/// Parses a comma-separated list of millisecond delays.
fn parse_delay_list(raw: &str) -> Result<Vec<u64>, SyncError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>().map_err(|e| {
                SyncError::InvalidConfig(format!("RECONNECT_DELAYS_MS entry {part:?}: {e}"))
            })
        })
        .collect()
}

/// Parses a comma-separated list of view scopes, dropping duplicates.
fn parse_scopes(raw: &str) -> Result<Vec<ViewScope>, SyncError> {
    let mut scopes = Vec::new();
    for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
        let scope: ViewScope = part.parse()?;
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    Ok(scopes)
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key)
        .ok()
        .map(|v| v.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_list_parses_and_trims() {
        assert!(matches!(
            parse_delay_list(" 0, 250 ,1000,"),
            Ok(ref v) if v == &[0, 250, 1000]
        ));
        assert!(parse_delay_list("0,soon").is_err());
        assert!(matches!(parse_delay_list(""), Ok(ref v) if v.is_empty()));
    }

    #[test]
    fn empty_delay_list_is_an_invalid_policy() {
        let parsed = parse_delay_list(" , ").unwrap_or_default();
        assert!(ReconnectPolicy::from_millis(&parsed).is_err());
    }

    #[test]
    fn keepalive_must_undercut_server_timeout() {
        assert!(check_liveness(Duration::from_secs(15), Duration::from_secs(30)).is_ok());
        assert!(check_liveness(Duration::from_secs(30), Duration::from_secs(30)).is_err());
        assert!(check_liveness(Duration::ZERO, Duration::from_secs(30)).is_err());
    }

    #[test]
    fn scopes_parse_and_dedup() {
        assert!(matches!(
            parse_scopes("feed,mine,feed"),
            Ok(ref v) if v == &[ViewScope::PublicFeed, ViewScope::OwnerSubmissions]
        ));
        assert!(parse_scopes("feed,garage").is_err());
    }
}
