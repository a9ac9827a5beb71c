//! Per-family circuit breaker for the remote backend.
//!
//! A family goes from `Enabled` to `Disabled { until }` on a connectivity
//! failure and comes back on the first check at or after `until`. There is no
//! background timer, backoff or jitter. Time comes from `tokio::time` so a
//! paused test clock drives the cooldown.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dormglide_shared::constants::MAX_REMOTE_COOLDOWN_SECS;
use serde::Serialize;
use tokio::time::Instant;

/// Group of remote operations that share one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFamily {
    Products,
    Chat,
    Auth,
}

impl BackendFamily {
    pub const ALL: [BackendFamily; 3] = [Self::Products, Self::Chat, Self::Auth];
}

impl fmt::Display for BackendFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Products => f.write_str("products"),
            Self::Chat => f.write_str("chat"),
            Self::Auth => f.write_str("auth"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Enabled,
    Disabled { until: Instant },
}

/// Circuit state for every family. Clones share state.
#[derive(Debug, Clone)]
pub struct AvailabilityTracker {
    disabled: Arc<Mutex<HashMap<BackendFamily, Instant>>>,
    cooldown: Duration,
}

impl AvailabilityTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            disabled: Arc::new(Mutex::new(HashMap::new())),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Current state of `family`, re-enabling it if its cooldown has passed.
    pub fn availability(&self, family: BackendFamily) -> Availability {
        let mut disabled = self.disabled.lock().unwrap_or_else(PoisonError::into_inner);
        match disabled.get(&family).copied() {
            None => Availability::Enabled,
            Some(until) if Instant::now() >= until => {
                disabled.remove(&family);
                tracing::info!(%family, "remote backend re-enabled after cooldown");
                Availability::Enabled
            }
            Some(until) => Availability::Disabled { until },
        }
    }

    pub fn is_enabled(&self, family: BackendFamily) -> bool {
        self.availability(family) == Availability::Enabled
    }

    /// Open the circuit for `family` for one cooldown period.
    pub fn record_failure(&self, family: BackendFamily) {
        let now = Instant::now();
        let until = now
            .checked_add(self.cooldown)
            .unwrap_or_else(|| now + Duration::from_secs(MAX_REMOTE_COOLDOWN_SECS));
        self.disabled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(family, until);
        tracing::warn!(
            %family,
            cooldown_secs = self.cooldown.as_secs(),
            "remote backend disabled after connectivity failure"
        );
    }

    /// Close the circuit immediately.
    pub fn reset(&self, family: BackendFamily) {
        self.disabled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&family);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_failure_disables_until_cooldown_elapses() {
        let tracker = AvailabilityTracker::new(Duration::from_secs(30));
        assert!(tracker.is_enabled(BackendFamily::Products));

        tracker.record_failure(BackendFamily::Products);
        assert!(matches!(
            tracker.availability(BackendFamily::Products),
            Availability::Disabled { .. }
        ));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!tracker.is_enabled(BackendFamily::Products));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(tracker.is_enabled(BackendFamily::Products));
    }

    #[tokio::test(start_paused = true)]
    async fn test_families_are_independent() {
        let tracker = AvailabilityTracker::new(Duration::from_secs(30));
        tracker.record_failure(BackendFamily::Chat);
        assert!(!tracker.is_enabled(BackendFamily::Chat));
        assert!(tracker.is_enabled(BackendFamily::Products));
        assert!(tracker.is_enabled(BackendFamily::Auth));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_state_and_reset() {
        let tracker = AvailabilityTracker::new(Duration::from_secs(30));
        let other = tracker.clone();
        tracker.record_failure(BackendFamily::Auth);
        assert!(!other.is_enabled(BackendFamily::Auth));

        other.reset(BackendFamily::Auth);
        assert!(tracker.is_enabled(BackendFamily::Auth));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_cooldown_does_not_overflow() {
        let tracker = AvailabilityTracker::new(Duration::from_secs(u64::MAX));
        tracker.record_failure(BackendFamily::Products);
        assert!(!tracker.is_enabled(BackendFamily::Products));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failure_extends_window() {
        let tracker = AvailabilityTracker::new(Duration::from_secs(30));
        tracker.record_failure(BackendFamily::Products);
        tokio::time::advance(Duration::from_secs(20)).await;
        tracker.record_failure(BackendFamily::Products);
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(!tracker.is_enabled(BackendFamily::Products));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(tracker.is_enabled(BackendFamily::Products));
    }
}
