//! Reconnection delay table.
//!
//! A [`ReconnectPolicy`] is a bounded, non-empty sequence of delays. The
//! n-th reconnect attempt after a drop waits `delays[n]`; attempts past the
//! end of the table keep waiting the last entry, so the retry interval
//! never exceeds the tail delay.

use std::time::Duration;

use crate::error::SyncError;

/// Default reconnect delays in milliseconds: immediate, 1 s, 2 s, 5 s, 10 s.
pub const DEFAULT_RECONNECT_DELAYS_MS: [u64; 5] = [0, 1_000, 2_000, 5_000, 10_000];

/// Bounded reconnection backoff table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delays: Vec<Duration>,
}

impl ReconnectPolicy {
    /// Creates a policy from an explicit delay table.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `delays` is empty.
    pub fn new(delays: Vec<Duration>) -> Result<Self, SyncError> {
        if delays.is_empty() {
            return Err(SyncError::InvalidConfig(
                "reconnect delay table must not be empty".to_string(),
            ));
        }
        Ok(Self { delays })
    }

    /// Creates a policy from delays given in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidConfig`] if `delays_ms` is empty.
    pub fn from_millis(delays_ms: &[u64]) -> Result<Self, SyncError> {
        Self::new(delays_ms.iter().copied().map(Duration::from_millis).collect())
    }

    /// Delay before the zero-based reconnect `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = usize::try_from(attempt).unwrap_or(usize::MAX);
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or_default()
    }

    /// Largest delay this policy will ever wait.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.delays.iter().copied().max().unwrap_or_default()
    }

    /// The declared delay table.
    #[must_use]
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_RECONNECT_DELAYS_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_is_rejected() {
        assert!(ReconnectPolicy::new(Vec::new()).is_err());
        assert!(ReconnectPolicy::from_millis(&[]).is_err());
    }

    #[test]
    fn follows_table_then_repeats_tail() {
        let policy = ReconnectPolicy::default();
        let observed: Vec<u64> = (0..8)
            .map(|attempt| {
                u64::try_from(policy.delay_for(attempt).as_millis()).unwrap_or(u64::MAX)
            })
            .collect();
        assert_eq!(
            observed,
            vec![0, 1_000, 2_000, 5_000, 10_000, 10_000, 10_000, 10_000]
        );
    }

    #[test]
    fn never_exceeds_max_delay() {
        let policy = ReconnectPolicy::default();
        let max = policy.max_delay();
        assert_eq!(max, Duration::from_secs(10));
        for attempt in [0, 3, 4, 5, 100, u32::MAX] {
            assert!(policy.delay_for(attempt) <= max);
        }
    }

    #[test]
    fn custom_table() {
        let Ok(policy) = ReconnectPolicy::from_millis(&[50, 20]) else {
            panic!("non-empty table rejected");
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(50));
        assert_eq!(policy.delay_for(1), Duration::from_millis(20));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.max_delay(), Duration::from_millis(50));
        assert_eq!(policy.delays().len(), 2);
    }
}
