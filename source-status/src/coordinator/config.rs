//! Coordinator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::{DEFAULT_EVENT_CAPACITY, FailurePolicy};
use crate::{Error, Result};

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 50;

/// Default maximum number of ids per batch check.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// Default delay between polls of still-pending ids.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1_000;

/// Default timeout for a single batch check.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// How resolved resources are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorMode {
    /// One coordinator for the whole process. Resolved ids can be enqueued
    /// again at any time; `reload` re-polls everything in the cache.
    #[default]
    Shared,
    /// Owned by a single consumer. Resolved ids are ignored by `enqueue`
    /// until `reload` forgets them.
    Scoped,
}

impl CoordinatorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Scoped => "scoped",
        }
    }
}

impl std::fmt::Display for CoordinatorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status coordinator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub mode: CoordinatorMode,
    /// Quiet period after the last enqueue before a batch is fetched.
    pub debounce_window_ms: u64,
    /// Maximum ids handed to one batch check.
    pub max_batch_size: usize,
    /// Delay before re-polling ids that are still pending.
    pub retry_interval_ms: u64,
    /// Per-call timeout for the batch check, `None` waits forever.
    pub call_timeout_ms: Option<u64>,
    /// Capacity of the status event channel.
    pub event_capacity: usize,
    /// Kept last so it serializes as a trailing TOML table.
    pub failure_policy: FailurePolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            mode: CoordinatorMode::default(),
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            call_timeout_ms: Some(DEFAULT_CALL_TIMEOUT_MS),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Default configuration for a consumer-scoped coordinator.
    pub fn scoped() -> Self {
        Self {
            mode: CoordinatorMode::Scoped,
            ..Self::default()
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Check the configuration for values the coordinator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::config("max_batch_size must be at least 1"));
        }
        if self.retry_interval_ms == 0 {
            return Err(Error::config("retry_interval_ms must be positive"));
        }
        if self.call_timeout_ms == Some(0) {
            return Err(Error::config("call_timeout_ms must be positive"));
        }
        if self.event_capacity == 0 {
            return Err(Error::config("event_capacity must be at least 1"));
        }
        self.failure_policy.validate().map_err(Error::Configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::BackoffConfig;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.mode, CoordinatorMode::Shared);
        assert_eq!(config.debounce_window(), Duration::from_millis(50));
        assert_eq!(config.max_batch_size, 50);
        assert_eq!(config.retry_interval(), Duration::from_secs(1));
        assert_eq!(config.call_timeout(), Some(Duration::from_secs(30)));
        assert!(config.validate().is_ok());

        assert_eq!(CoordinatorConfig::scoped().mode, CoordinatorMode::Scoped);
    }

    #[rstest]
    #[case::zero_batch(CoordinatorConfig { max_batch_size: 0, ..Default::default() })]
    #[case::zero_retry(CoordinatorConfig { retry_interval_ms: 0, ..Default::default() })]
    #[case::zero_timeout(CoordinatorConfig { call_timeout_ms: Some(0), ..Default::default() })]
    #[case::zero_capacity(CoordinatorConfig { event_capacity: 0, ..Default::default() })]
    #[case::bad_backoff(CoordinatorConfig {
        failure_policy: FailurePolicy::Backoff(BackoffConfig { max_attempts: 0, ..Default::default() }),
        ..Default::default()
    })]
    fn test_validate_rejects(#[case] config: CoordinatorConfig) {
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_zero_debounce_and_no_timeout_are_allowed() {
        let config = CoordinatorConfig {
            debounce_window_ms: 0,
            call_timeout_ms: None,
            failure_policy: FailurePolicy::Stall,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"mode":"scoped","max_batch_size":10}"#).unwrap();
        assert_eq!(config.mode, CoordinatorMode::Scoped);
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.retry_interval_ms, DEFAULT_RETRY_INTERVAL_MS);
        assert_eq!(config.failure_policy, FailurePolicy::default());
    }
}
