//! StatusCoordinator implementation.
//!
//! The coordinator is a single task that owns the poll queue, the resolved
//! set and both timers. Everything reaches it through its mailbox, so state
//! changes never interleave.
//!
//! # Cycle
//!
//! 1. `Enqueue` adds ids to the [`PollQueue`] and arms the [`Debouncer`].
//! 2. When the debounce window passes, a bounded batch is taken from the
//!    front of the queue and handed to the [`BatchChecker`] on its own task.
//! 3. The result is merged into the [`StatusCache`]. Terminal ids leave the
//!    queue, pending ones rotate to the back.
//! 4. While the queue is non-empty the retry timer re-runs step 2.
//!
//! Only one batch is in flight at a time, and while a batch is in flight or
//! a retry is scheduled, enqueues only grow the queue.

use std::collections::HashMap;
use std::future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::checker::{BatchChecker, CheckError};
use super::config::{CoordinatorConfig, CoordinatorMode};
use super::handle::CoordinatorHandle;
use super::messages::{CoordinatorMessage, CoordinatorOutcome, CoordinatorState, CyclePhase};
use crate::Result;
use crate::domain::{ResourceId, StatusRecord};
use crate::monitor::{
    Debouncer, DelayTimer, PollQueue, ResolvedSet, StatusCache, StatusEvent,
    StatusEventBroadcaster,
};

/// Result of one batch check task.
#[derive(Debug)]
enum FetchOutcome {
    Completed(HashMap<ResourceId, StatusRecord>),
    Failed(CheckError),
    TimedOut(Duration),
}

/// The batch currently being checked.
struct InFlightFetch {
    ids: Vec<ResourceId>,
    /// Reset generation the batch was started in.
    generation: u64,
    started_at: Instant,
    task: JoinHandle<FetchOutcome>,
}

/// Polls and caches the status of data sources.
pub struct StatusCoordinator<B: BatchChecker + ?Sized> {
    /// Name used in logs.
    name: String,
    config: CoordinatorConfig,
    mailbox: mpsc::UnboundedReceiver<CoordinatorMessage>,
    queue: PollQueue,
    resolved: ResolvedSet,
    cache: Arc<StatusCache>,
    checker: Arc<B>,
    debouncer: Debouncer,
    retry_timer: DelayTimer,
    in_flight: Option<InFlightFetch>,
    /// Bumped by every reset so late results can be recognised.
    generation: u64,
    state: CoordinatorState,
    cancellation_token: CancellationToken,
}

impl<B: BatchChecker + ?Sized> StatusCoordinator<B> {
    /// Create a new coordinator and the handle used to talk to it.
    ///
    /// The coordinator does nothing until [`run`](Self::run) is polled.
    pub fn new(
        name: impl Into<String>,
        config: CoordinatorConfig,
        checker: Arc<B>,
        cancellation_token: CancellationToken,
    ) -> Result<(Self, CoordinatorHandle)> {
        config.validate()?;

        let name = name.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = Arc::new(StatusCache::with_broadcaster(
            StatusEventBroadcaster::with_capacity(config.event_capacity),
        ));
        let handle = CoordinatorHandle::new(
            name.clone(),
            tx,
            Arc::clone(&cache),
            cancellation_token.clone(),
        );

        let coordinator = Self {
            state: CoordinatorState::new(name.clone(), config.mode),
            name,
            debouncer: Debouncer::new(config.debounce_window()),
            config,
            mailbox: rx,
            queue: PollQueue::new(),
            resolved: ResolvedSet::new(),
            cache,
            checker,
            retry_timer: DelayTimer::new(),
            in_flight: None,
            generation: 0,
            cancellation_token,
        };

        Ok((coordinator, handle))
    }

    /// Run the coordinator's event loop.
    ///
    /// Runs until the cancellation token fires or every handle is dropped.
    pub async fn run(mut self) -> CoordinatorOutcome {
        info!(
            "StatusCoordinator {} starting ({} mode, batch size {}, debounce {:?}, retry every {:?})",
            self.name,
            self.config.mode,
            self.config.max_batch_size,
            self.debouncer.window(),
            self.config.retry_interval()
        );

        let outcome = loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    info!("StatusCoordinator {} cancelled", self.name);
                    break CoordinatorOutcome::Cancelled;
                }

                msg = self.mailbox.recv() => match msg {
                    Some(msg) => self.handle_message(msg),
                    None => {
                        debug!("StatusCoordinator {} has no handles left", self.name);
                        break CoordinatorOutcome::Detached;
                    }
                },

                joined = Self::join_in_flight(&mut self.in_flight) => {
                    self.complete_cycle(joined);
                }

                _ = self.debouncer.fired() => {
                    trace!("StatusCoordinator {} debounce window elapsed", self.name);
                    self.start_cycle();
                }

                _ = self.retry_timer.elapsed() => {
                    trace!("StatusCoordinator {} retry timer fired", self.name);
                    self.start_cycle();
                }
            }
        };

        self.teardown();
        info!("StatusCoordinator {} stopped ({:?})", self.name, outcome);
        outcome
    }

    /// Wait for the in-flight batch. Pending forever when nothing is in flight.
    async fn join_in_flight(
        in_flight: &mut Option<InFlightFetch>,
    ) -> std::result::Result<FetchOutcome, JoinError> {
        match in_flight {
            Some(fetch) => (&mut fetch.task).await,
            None => future::pending().await,
        }
    }

    fn handle_message(&mut self, msg: CoordinatorMessage) {
        if self.cancellation_token.is_cancelled() {
            return;
        }

        match msg {
            CoordinatorMessage::Enqueue(ids) => self.handle_enqueue(ids),
            CoordinatorMessage::Reload => self.handle_reload(),
            CoordinatorMessage::Reset => self.handle_reset(),
            CoordinatorMessage::GetState(reply) => {
                // Ignore if receiver dropped
                let _ = reply.send(self.snapshot_state());
            }
        }
    }

    fn handle_enqueue(&mut self, ids: Vec<ResourceId>) {
        let was_stalled = self.phase() == CyclePhase::Stalled;

        let mut added = 0usize;
        for id in ids {
            if self.config.mode == CoordinatorMode::Scoped && self.resolved.contains(id) {
                trace!(
                    "StatusCoordinator {} ignoring resolved source {}",
                    self.name, id
                );
                continue;
            }
            if self.queue.push(id) {
                added += 1;
            }
        }

        if self.queue.is_empty() {
            return;
        }

        // Re-requesting queued ids must not push the debounce deadline back.
        if added == 0 && !was_stalled {
            return;
        }

        if added > 0 {
            debug!(
                "StatusCoordinator {} queued {} source(s), {} waiting",
                self.name,
                added,
                self.queue.len()
            );
        }

        if was_stalled && self.state.consecutive_failures > 0 {
            info!(
                "StatusCoordinator {} resuming stalled polling after {} failure(s)",
                self.name, self.state.consecutive_failures
            );
            self.state.consecutive_failures = 0;
        }

        // A running loop picks new ids up on its next pass.
        if self.in_flight.is_none() && !self.retry_timer.is_scheduled() {
            self.debouncer.trigger();
        }
    }

    fn handle_reload(&mut self) {
        match self.config.mode {
            CoordinatorMode::Shared => {
                let ids = self.cache.ids();
                info!(
                    "StatusCoordinator {} reloading {} cached source(s)",
                    self.name,
                    ids.len()
                );
                self.handle_enqueue(ids);
            }
            CoordinatorMode::Scoped => {
                info!(
                    "StatusCoordinator {} forgetting {} resolved source(s)",
                    self.name,
                    self.resolved.len()
                );
                self.resolved.clear();
            }
        }
    }

    fn handle_reset(&mut self) {
        info!(
            "StatusCoordinator {} reset ({} queued, {} cached)",
            self.name,
            self.queue.len(),
            self.cache.len()
        );

        self.generation += 1;
        self.debouncer.cancel();
        self.retry_timer.cancel();
        self.queue.clear();
        self.resolved.clear();
        self.state.consecutive_failures = 0;
        self.cache.clear();
    }

    /// Start a fetch cycle unless one is already running.
    fn start_cycle(&mut self) {
        if self.cancellation_token.is_cancelled() {
            return;
        }
        if self.in_flight.is_some() {
            trace!(
                "StatusCoordinator {} batch already in flight, deferring",
                self.name
            );
            return;
        }

        self.debouncer.cancel();
        self.retry_timer.cancel();

        let ids = self.queue.peek_batch(self.config.max_batch_size);
        if ids.is_empty() {
            debug!("StatusCoordinator {} nothing queued, idle", self.name);
            return;
        }

        debug!(
            "StatusCoordinator {} checking batch of {} ({} queued)",
            self.name,
            ids.len(),
            self.queue.len()
        );

        let checker = Arc::clone(&self.checker);
        let call_timeout = self.config.call_timeout();
        let batch = ids.clone();
        let task = tokio::spawn(async move {
            let check = checker.batch_check(&batch);
            match call_timeout {
                Some(limit) => match tokio::time::timeout(limit, check).await {
                    Ok(Ok(records)) => FetchOutcome::Completed(records),
                    Ok(Err(e)) => FetchOutcome::Failed(e),
                    Err(_) => FetchOutcome::TimedOut(limit),
                },
                None => match check.await {
                    Ok(records) => FetchOutcome::Completed(records),
                    Err(e) => FetchOutcome::Failed(e),
                },
            }
        });

        self.in_flight = Some(InFlightFetch {
            ids,
            generation: self.generation,
            started_at: Instant::now(),
            task,
        });
    }

    fn complete_cycle(&mut self, joined: std::result::Result<FetchOutcome, JoinError>) {
        let Some(fetch) = self.in_flight.take() else {
            return;
        };
        if self.cancellation_token.is_cancelled() {
            return;
        }

        if fetch.generation != self.generation {
            debug!(
                "StatusCoordinator {} discarding result of a batch started before reset",
                self.name
            );
            if !self.queue.is_empty() {
                self.debouncer.trigger();
            }
            return;
        }

        let outcome = joined.unwrap_or_else(|e| {
            FetchOutcome::Failed(CheckError::transient(format!("batch check task failed: {e}")))
        });

        trace!(
            "StatusCoordinator {} batch of {} finished in {:?}",
            self.name,
            fetch.ids.len(),
            fetch.started_at.elapsed()
        );

        match outcome {
            FetchOutcome::Completed(records) => self.apply_results(&fetch.ids, records),
            FetchOutcome::Failed(error) => self.handle_failure(&fetch.ids, error),
            FetchOutcome::TimedOut(limit) => {
                let reason = format!("status check timed out after {}ms", limit.as_millis());
                let degraded = fetch
                    .ids
                    .iter()
                    .map(|id| (*id, StatusRecord::unknown(*id, reason.clone())))
                    .collect();
                self.cache.merge(degraded);
                self.handle_failure(&fetch.ids, CheckError::transient(reason));
            }
        }
    }

    fn apply_results(
        &mut self,
        requested: &[ResourceId],
        records: HashMap<ResourceId, StatusRecord>,
    ) {
        let mut terminal = Vec::new();
        let mut pending = Vec::new();
        for id in requested {
            match records.get(id) {
                Some(record) if record.is_terminal() => terminal.push(*id),
                _ => pending.push(*id),
            }
        }

        let missing = requested
            .iter()
            .filter(|id| !records.contains_key(id))
            .count();
        if missing > 0 {
            debug!(
                "StatusCoordinator {} got no status for {} of {} source(s), polling again",
                self.name,
                missing,
                requested.len()
            );
        }

        self.cache.merge(records);
        self.queue.remove_all(&terminal);
        if self.config.mode == CoordinatorMode::Scoped {
            self.resolved.extend(terminal.iter().copied());
        }
        self.queue.rotate_to_back(&pending);
        self.state.record_cycle(true);

        debug!(
            "StatusCoordinator {} batch complete: {} resolved, {} pending, {} queued",
            self.name,
            terminal.len(),
            pending.len(),
            self.queue.len()
        );

        self.schedule_next();
    }

    fn handle_failure(&mut self, ids: &[ResourceId], error: CheckError) {
        self.state.record_cycle(false);
        let failures = self.state.consecutive_failures;

        let retry_in = if error.transient {
            self.config.failure_policy.retry_delay(failures)
        } else {
            None
        };

        match retry_in {
            Some(delay) => {
                warn!(
                    "StatusCoordinator {} batch check failed: {} (attempt {}, retrying in {:?})",
                    self.name, error, failures, delay
                );
                self.retry_timer.schedule(delay);
            }
            None => {
                warn!(
                    "StatusCoordinator {} batch check failed: {} (attempt {}), {} source(s) stay queued until the next enqueue",
                    self.name,
                    error,
                    failures,
                    self.queue.len()
                );
            }
        }

        self.cache.broadcaster().publish(StatusEvent::CycleFailed {
            ids: ids.to_vec(),
            error: error.message,
            consecutive_failures: failures,
            retry_in_ms: retry_in
                .map(|delay| u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
            timestamp: Utc::now(),
        });
    }

    /// Schedule the next pass if anything is still pending.
    fn schedule_next(&mut self) {
        if self.cancellation_token.is_cancelled() {
            return;
        }
        if self.queue.is_empty() {
            debug!("StatusCoordinator {} all sources resolved, idle", self.name);
            return;
        }
        self.retry_timer.schedule(self.config.retry_interval());
    }

    fn phase(&self) -> CyclePhase {
        if self.in_flight.is_some() {
            CyclePhase::Fetching
        } else if self.retry_timer.is_scheduled() {
            if self.state.consecutive_failures > 0 {
                CyclePhase::BackingOff
            } else {
                CyclePhase::WaitingRetry
            }
        } else if self.debouncer.is_armed() {
            CyclePhase::Debouncing
        } else if self.queue.is_empty() {
            CyclePhase::Idle
        } else {
            CyclePhase::Stalled
        }
    }

    fn snapshot_state(&self) -> CoordinatorState {
        let mut state = self.state.clone();
        state.phase = self.phase();
        state.queued = self.queue.len();
        state.resolved = self.resolved.len();
        state.cached = self.cache.len();
        state.in_flight = self.in_flight.as_ref().map_or(0, |fetch| fetch.ids.len());
        state
    }

    /// Drop timers and abandon the in-flight batch; its result is never read.
    fn teardown(&mut self) {
        self.debouncer.cancel();
        self.retry_timer.cancel();
        if let Some(fetch) = self.in_flight.take() {
            debug!(
                "StatusCoordinator {} abandoning in-flight batch of {}",
                self.name,
                fetch.ids.len()
            );
        }
        self.mailbox.close();
    }
}

/// Spawn a coordinator on the current tokio runtime.
pub fn spawn<B: BatchChecker + ?Sized>(
    name: impl Into<String>,
    config: CoordinatorConfig,
    checker: Arc<B>,
) -> Result<(CoordinatorHandle, JoinHandle<CoordinatorOutcome>)> {
    spawn_with_token(name, config, checker, CancellationToken::new())
}

/// Spawn a coordinator whose lifetime is bound to `cancellation_token`.
///
/// Pass `owner_token.child_token()` to tear the coordinator down together
/// with its owner.
pub fn spawn_with_token<B: BatchChecker + ?Sized>(
    name: impl Into<String>,
    config: CoordinatorConfig,
    checker: Arc<B>,
    cancellation_token: CancellationToken,
) -> Result<(CoordinatorHandle, JoinHandle<CoordinatorOutcome>)> {
    let (coordinator, handle) =
        StatusCoordinator::new(name, config, checker, cancellation_token)?;
    let task = tokio::spawn(coordinator.run());
    Ok((handle, task))
}
