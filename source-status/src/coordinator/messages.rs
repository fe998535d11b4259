//! Coordinator mailbox messages and state reporting.

use std::time::Instant;

use serde::Serialize;
use tokio::sync::oneshot;

use super::config::CoordinatorMode;
use crate::domain::ResourceId;

/// Messages that can be sent to a status coordinator.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Queue resources for a status fetch.
    Enqueue(Vec<ResourceId>),
    /// Re-arm polling (shared: everything cached, scoped: forget resolved ids).
    Reload,
    /// Drop the cache, the queue and any pending timer.
    Reset,
    /// Query current state (response sent via oneshot channel).
    GetState(oneshot::Sender<CoordinatorState>),
}

/// What the coordinator is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Nothing queued.
    Idle,
    /// Waiting for an enqueue burst to settle.
    Debouncing,
    /// A batch check is in flight.
    Fetching,
    /// Waiting to re-poll ids that are still pending.
    WaitingRetry,
    /// Waiting to retry after a failed batch check.
    BackingOff,
    /// Ids are queued but nothing will fetch them until the next enqueue.
    Stalled,
}

impl CyclePhase {
    /// Whether the coordinator will make progress without outside help.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Stalled)
    }
}

/// Snapshot of a coordinator's internal state.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorState {
    pub name: String,
    pub mode: CoordinatorMode,
    pub phase: CyclePhase,
    /// Ids waiting for a terminal status.
    pub queued: usize,
    /// Ids suppressed from re-enqueue (scoped mode only).
    pub resolved: usize,
    /// Entries in the status cache.
    pub cached: usize,
    /// Size of the batch currently in flight.
    pub in_flight: usize,
    pub total_cycles: u64,
    pub successful_cycles: u64,
    pub failed_cycles: u64,
    pub consecutive_failures: u32,
    /// Cycle success rate (0.0 to 1.0).
    pub success_rate: f64,
    /// When the last cycle completed.
    #[serde(skip)]
    pub last_cycle: Option<Instant>,
}

impl CoordinatorState {
    pub(crate) fn new(name: String, mode: CoordinatorMode) -> Self {
        Self {
            name,
            mode,
            phase: CyclePhase::Idle,
            queued: 0,
            resolved: 0,
            cached: 0,
            in_flight: 0,
            total_cycles: 0,
            successful_cycles: 0,
            failed_cycles: 0,
            consecutive_failures: 0,
            success_rate: 1.0,
            last_cycle: None,
        }
    }

    /// Record a completed fetch cycle.
    pub(crate) fn record_cycle(&mut self, success: bool) {
        self.total_cycles += 1;
        if success {
            self.successful_cycles += 1;
            self.consecutive_failures = 0;
        } else {
            self.failed_cycles += 1;
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        }
        self.success_rate = self.successful_cycles as f64 / self.total_cycles as f64;
        self.last_cycle = Some(Instant::now());
    }
}

/// How a coordinator's run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorOutcome {
    /// The cancellation token fired.
    Cancelled,
    /// Every handle was dropped.
    Detached,
}
