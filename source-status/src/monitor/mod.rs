//! Building blocks of the status coordinator.
//!
//! - [`StatusCache`]: latest status per resource, with change notifications
//! - [`PollQueue`] / [`ResolvedSet`]: what still needs fetching
//! - [`Debouncer`] / [`DelayTimer`]: burst coalescing and retry scheduling
//! - [`FailurePolicy`]: what to do when a batch check fails

mod backoff;
mod cache;
mod debounce;
mod events;
mod queue;
mod timer;

pub use backoff::{BackoffConfig, FailurePolicy};
pub use cache::StatusCache;
pub use debounce::{DEFAULT_DEBOUNCE_WINDOW, Debouncer};
pub use events::{DEFAULT_EVENT_CAPACITY, StatusEvent, StatusEventBroadcaster};
pub use queue::{PollQueue, ResolvedSet};
pub use timer::DelayTimer;
