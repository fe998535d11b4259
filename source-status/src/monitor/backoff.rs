//! Retry policy for failed batch checks.
//!
//! A failed batch leaves both the cache and the poll queue untouched. What
//! happens next is decided here: either polling stalls until a caller
//! enqueues again, or the coordinator retries with bounded exponential
//! backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Exponential backoff settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub base_delay_ms: u64,
    /// Upper bound for any single delay.
    pub max_delay_ms: u64,
    /// Consecutive failures after which polling stalls.
    pub max_attempts: u32,
    /// Spread delays by +/-25%.
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    /// Delay before the next attempt after `failures` consecutive failures.
    ///
    /// Returns `None` once `max_attempts` failures have been reached.
    pub fn delay_for(&self, failures: u32) -> Option<Duration> {
        if failures == 0 || failures >= self.max_attempts {
            return None;
        }

        let exponent = failures - 1;
        let exponential_delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.max_delay_ms);

        let delay = if self.jitter {
            // Add jitter (+/-25%)
            let jitter_range = exponential_delay / 4;
            let jitter: i64 = if jitter_range > 0 {
                let random_val = rand::random::<u64>() % (jitter_range.saturating_mul(2).max(1));
                random_val as i64 - jitter_range as i64
            } else {
                0
            };
            exponential_delay
                .saturating_add_signed(jitter)
                .min(self.max_delay_ms)
        } else {
            exponential_delay
        };

        Some(Duration::from_millis(delay))
    }
}

/// What to do after a batch check fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Do not retry; the failed ids stay queued until the next enqueue.
    Stall,
    /// Retry with bounded exponential backoff, then stall.
    Backoff(BackoffConfig),
}

impl FailurePolicy {
    /// Delay before retrying after `failures` consecutive transient failures.
    pub fn retry_delay(&self, failures: u32) -> Option<Duration> {
        match self {
            FailurePolicy::Stall => None,
            FailurePolicy::Backoff(config) => config.delay_for(failures),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            FailurePolicy::Stall => Ok(()),
            FailurePolicy::Backoff(config) => {
                if config.max_attempts == 0 {
                    return Err("backoff max_attempts must be at least 1".to_string());
                }
                if config.base_delay_ms == 0 {
                    return Err("backoff base_delay_ms must be positive".to_string());
                }
                if config.base_delay_ms > config.max_delay_ms {
                    return Err(format!(
                        "backoff base_delay_ms ({}) exceeds max_delay_ms ({})",
                        config.base_delay_ms, config.max_delay_ms
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Backoff(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_jitter() -> BackoffConfig {
        BackoffConfig {
            base_delay_ms: 1_000,
            max_delay_ms: 5_000,
            max_attempts: 6,
            jitter: false,
        }
    }

    #[test]
    fn test_exponential_growth_is_capped() {
        let config = without_jitter();
        assert_eq!(config.delay_for(1), Some(Duration::from_millis(1_000)));
        assert_eq!(config.delay_for(2), Some(Duration::from_millis(2_000)));
        assert_eq!(config.delay_for(3), Some(Duration::from_millis(4_000)));
        assert_eq!(config.delay_for(4), Some(Duration::from_millis(5_000)));
        assert_eq!(config.delay_for(5), Some(Duration::from_millis(5_000)));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let config = without_jitter();
        assert_eq!(config.delay_for(0), None);
        assert_eq!(config.delay_for(6), None);
        assert_eq!(config.delay_for(60), None);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = BackoffConfig {
            jitter: true,
            ..without_jitter()
        };

        for _ in 0..100 {
            let delay0 = config.delay_for(1).unwrap();
            assert!(delay0 >= Duration::from_millis(750));
            assert!(delay0 <= Duration::from_millis(1250));

            let delay1 = config.delay_for(2).unwrap();
            assert!(delay1 >= Duration::from_millis(1500));
            assert!(delay1 <= Duration::from_millis(2500));

            let capped = config.delay_for(5).unwrap();
            assert!(capped <= Duration::from_millis(5_000));
        }
    }

    #[test]
    fn test_stall_never_retries() {
        assert_eq!(FailurePolicy::Stall.retry_delay(1), None);
    }

    #[test]
    fn test_validate() {
        assert!(FailurePolicy::Stall.validate().is_ok());
        assert!(FailurePolicy::default().validate().is_ok());

        let inverted = FailurePolicy::Backoff(BackoffConfig {
            base_delay_ms: 10_000,
            max_delay_ms: 1_000,
            ..BackoffConfig::default()
        });
        assert!(inverted.validate().is_err());

        let no_attempts = FailurePolicy::Backoff(BackoffConfig {
            max_attempts: 0,
            ..BackoffConfig::default()
        });
        assert!(no_attempts.validate().is_err());
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(FailurePolicy::Stall).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "stall" }));

        let policy: FailurePolicy =
            serde_json::from_str(r#"{"kind":"backoff","max_attempts":2}"#).unwrap();
        assert_eq!(
            policy,
            FailurePolicy::Backoff(BackoffConfig {
                max_attempts: 2,
                ..BackoffConfig::default()
            })
        );
    }
}
