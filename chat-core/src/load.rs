//! Loading state for requests that expect a response.
//!
//! The channel gives no request/response guarantee, so a request that is
//! never answered would otherwise stay loading forever. [`LoadState::expired`]
//! lets the owner move such requests to a terminal `Failed` state.

use std::time::{Duration, Instant};

/// Reason recorded when a request outlives its timeout.
pub const TIMED_OUT: &str = "timed out";

/// Progress of a single outstanding request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Never requested.
    #[default]
    Idle,
    /// Request emitted, waiting for the response.
    Loading {
        /// When the request was emitted.
        since: Instant,
    },
    /// Response applied.
    Loaded,
    /// Request failed or timed out.
    Failed {
        /// Why the request failed.
        reason: String,
    },
}

impl LoadState {
    /// True while a response is outstanding.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// True once a response has been applied.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded)
    }

    /// True when loading for at least `timeout` as of `now`.
    pub fn expired(&self, now: Instant, timeout: Duration) -> bool {
        match self {
            Self::Loading { since } => now.saturating_duration_since(*since) >= timeout,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_by_default() {
        let state = LoadState::default();
        assert!(!state.is_loading());
        assert!(!state.is_loaded());
    }

    #[test]
    fn only_loading_expires() {
        let start = Instant::now();
        let later = start + Duration::from_secs(31);
        let timeout = Duration::from_secs(30);

        assert!(LoadState::Loading { since: start }.expired(later, timeout));
        assert!(!LoadState::Loading { since: start }.expired(start, timeout));
        assert!(!LoadState::Loaded.expired(later, timeout));
        assert!(!LoadState::Idle.expired(later, timeout));
    }

    #[test]
    fn clock_going_backwards_does_not_expire() {
        let start = Instant::now();
        let since = start + Duration::from_secs(5);
        assert!(!LoadState::Loading { since }.expired(start, Duration::from_secs(1)));
    }
}
