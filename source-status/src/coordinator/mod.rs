//! Status coordinator.
//!
//! The coordinator decides *when* to ask the backend about which data
//! sources, and caches the answers:
//!
//! - Enqueue bursts are debounced into one batch check
//! - Batches are bounded and only one is in flight at a time
//! - Sources that are still being tested are re-polled at a fixed cadence
//! - Teardown is cooperative via a [`CancellationToken`](tokio_util::sync::CancellationToken)

mod actor;
mod checker;
mod config;
mod handle;
mod messages;

pub use actor::{StatusCoordinator, spawn, spawn_with_token};
pub use checker::{BatchChecker, CheckError};
pub use config::{
    CoordinatorConfig, CoordinatorMode, DEFAULT_CALL_TIMEOUT_MS, DEFAULT_DEBOUNCE_WINDOW_MS,
    DEFAULT_MAX_BATCH_SIZE, DEFAULT_RETRY_INTERVAL_MS,
};
pub use handle::CoordinatorHandle;
pub use messages::{CoordinatorMessage, CoordinatorOutcome, CoordinatorState, CyclePhase};
