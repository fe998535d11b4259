//! Status change events.
//!
//! Every completed merge into the [`StatusCache`](super::StatusCache) is
//! announced on a broadcast channel, so any number of consumers can react to
//! status changes without the coordinator knowing who they are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::{ResourceId, StatusRecord};

/// Default channel capacity for status events.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Events emitted by the status cache and coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatusEvent {
    /// A fetch cycle completed and its records were merged.
    Updated {
        records: Vec<StatusRecord>,
        timestamp: DateTime<Utc>,
    },
    /// The cache was cleared by a reset.
    Cleared { timestamp: DateTime<Utc> },
    /// A batch check failed; the cache was left untouched.
    CycleFailed {
        ids: Vec<ResourceId>,
        error: String,
        consecutive_failures: u32,
        /// Delay before the next automatic attempt, `None` when polling stalls.
        retry_in_ms: Option<u64>,
        timestamp: DateTime<Utc>,
    },
}

impl StatusEvent {
    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            StatusEvent::Updated { records, .. } => {
                let resolved = records.iter().filter(|r| r.is_terminal()).count();
                format!(
                    "{} status(es) updated, {} resolved",
                    records.len(),
                    resolved
                )
            }
            StatusEvent::Cleared { .. } => "status cache cleared".to_string(),
            StatusEvent::CycleFailed {
                ids,
                error,
                consecutive_failures,
                retry_in_ms,
                ..
            } => match retry_in_ms {
                Some(delay) => format!(
                    "check of {} source(s) failed: {} (attempt {}, retrying in {}ms)",
                    ids.len(),
                    error,
                    consecutive_failures,
                    delay
                ),
                None => format!(
                    "check of {} source(s) failed: {} (attempt {}, not retrying)",
                    ids.len(),
                    error,
                    consecutive_failures
                ),
            },
        }
    }
}

/// Broadcaster for status events.
#[derive(Clone)]
pub struct StatusEventBroadcaster {
    sender: broadcast::Sender<StatusEvent>,
}

impl StatusEventBroadcaster {
    /// Create a new broadcaster with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a new broadcaster with specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to status events.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    /// Publish a status event.
    ///
    /// Returns the number of receivers that got the event, 0 without subscribers.
    pub fn publish(&self, event: StatusEvent) -> usize {
        tracing::trace!("Publishing status event: {}", event.description());
        self.sender.send(event).unwrap_or(0)
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StatusEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
