//! A fake status backend for exercising the coordinator from the command line.

use std::collections::HashMap;
use std::future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use source_status::{BatchChecker, CheckError, ResourceId, SourceStatus, StatusRecord};
use tracing::debug;

/// Behaviour of the simulated backend (`[backend]` in the config file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Round-trip time of every batch check.
    pub latency_ms: u64,
    /// How many polls a source reports `TESTING` before it resolves.
    pub testing_rounds: u32,
    /// Fail every Nth call with a transient error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_every: Option<u64>,
    /// Never answer every Nth call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hang_every: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            latency_ms: 200,
            testing_rounds: 1,
            fail_every: None,
            hang_every: None,
        }
    }
}

/// [`BatchChecker`] that resolves sources after a configurable number of polls.
///
/// Final statuses are derived from the id so runs are reproducible.
pub struct SimulatedChecker {
    config: SimulationConfig,
    calls: AtomicU64,
    polls: Mutex<HashMap<ResourceId, u32>>,
}

impl SimulatedChecker {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            calls: AtomicU64::new(0),
            polls: Mutex::new(HashMap::new()),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn record_for(&self, id: ResourceId, polls: u32) -> StatusRecord {
        if polls <= self.config.testing_rounds {
            return StatusRecord::new(id, SourceStatus::Testing);
        }
        let resource_type = if id.get() % 2 == 0 { "postgres" } else { "mysql" };
        let record = match id.get() {
            n if n % 11 == 0 => StatusRecord::new(id, SourceStatus::Disabled),
            n if n % 7 == 0 => StatusRecord::new(id, SourceStatus::NoPassword)
                .with_error(Some("AUTH_MISSING".to_string()), "no stored credentials"),
            n if n % 3 == 0 => StatusRecord::new(id, SourceStatus::Inactive)
                .with_error(Some("CONN_REFUSED".to_string()), "connection refused"),
            _ => StatusRecord::new(id, SourceStatus::Active),
        };
        record.with_resource_type(resource_type)
    }
}

fn every(n: u64, period: Option<u64>) -> bool {
    matches!(period, Some(p) if p > 0 && n % p == 0)
}

#[async_trait]
impl BatchChecker for SimulatedChecker {
    async fn batch_check(
        &self,
        ids: &[ResourceId],
    ) -> Result<HashMap<ResourceId, StatusRecord>, CheckError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Simulated backend call #{} for {} source(s)", call, ids.len());

        if every(call, self.config.hang_every) {
            debug!("Simulated backend call #{} hangs", call);
            return future::pending().await;
        }

        tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;

        if every(call, self.config.fail_every) {
            return Err(CheckError::transient(format!(
                "simulated backend failure on call #{call}"
            )));
        }

        let mut polls = self.polls.lock();
        Ok(ids
            .iter()
            .map(|id| {
                let count = polls.entry(*id).or_insert(0);
                *count += 1;
                (*id, self.record_for(*id, *count))
            })
            .collect())
    }
}
