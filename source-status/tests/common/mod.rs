//! Shared helpers for coordinator integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use source_status::{BatchChecker, CheckError, ResourceId, SourceStatus, StatusRecord};

pub type CheckResult = Result<HashMap<ResourceId, StatusRecord>, CheckError>;

type Script = Box<dyn Fn(usize, &[ResourceId]) -> CheckResult + Send + Sync>;

/// Batch checker driven by a closure of `(call index, requested ids)`.
///
/// Records every call and the highest number of overlapping calls.
pub struct ScriptedChecker {
    script: Script,
    latency: Duration,
    calls: Mutex<Vec<Vec<ResourceId>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedChecker {
    pub fn new(script: impl Fn(usize, &[ResourceId]) -> CheckResult + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Report every requested id with the same status.
    pub fn always(status: SourceStatus) -> Self {
        Self::new(move |_, ids| Ok(uniform(ids, status)))
    }

    /// Fail every call with a transient error.
    pub fn failing() -> Self {
        Self::new(|_, _| Err(CheckError::transient("backend unavailable")))
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<Vec<ResourceId>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BatchChecker for ScriptedChecker {
    async fn batch_check(&self, ids: &[ResourceId]) -> CheckResult {
        let index = {
            let mut calls = self.calls.lock();
            calls.push(ids.to_vec());
            calls.len() - 1
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        (self.script)(index, ids)
    }
}

pub fn ids(raw: impl IntoIterator<Item = i64>) -> Vec<ResourceId> {
    raw.into_iter().map(ResourceId::new).collect()
}

pub fn uniform(ids: &[ResourceId], status: SourceStatus) -> HashMap<ResourceId, StatusRecord> {
    ids.iter()
        .map(|id| (*id, StatusRecord::new(*id, status)))
        .collect()
}

pub fn records(entries: &[(i64, SourceStatus)]) -> HashMap<ResourceId, StatusRecord> {
    entries
        .iter()
        .map(|(id, status)| {
            let id = ResourceId::new(*id);
            (id, StatusRecord::new(id, *status))
        })
        .collect()
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
