//! Consumer-facing handle to a status coordinator.
//!
//! Writes (`enqueue`, `reload`, `reset`) are fire-and-forget messages to the
//! coordinator task; reads go straight to the shared [`StatusCache`].

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::trace;

use super::messages::{CoordinatorMessage, CoordinatorState};
use crate::domain::{ResourceId, SourceStatus, StatusRecord};
use crate::monitor::{StatusCache, StatusEvent};
use crate::{Error, Result};

/// A cloneable handle to a running [`StatusCoordinator`](super::StatusCoordinator).
#[derive(Clone)]
pub struct CoordinatorHandle {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<CoordinatorMessage>,
    cache: Arc<StatusCache>,
    cancellation_token: CancellationToken,
}

impl CoordinatorHandle {
    pub(crate) fn new(
        name: String,
        sender: mpsc::UnboundedSender<CoordinatorMessage>,
        cache: Arc<StatusCache>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            sender,
            cache,
            cancellation_token,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue resources for a status fetch.
    ///
    /// Never fails: invalid, already queued and (in scoped mode) resolved ids
    /// are dropped, and calls after disposal are ignored.
    pub fn enqueue(&self, ids: impl IntoIterator<Item = ResourceId>) {
        let ids: Vec<ResourceId> = ids.into_iter().filter(|id| id.is_valid()).collect();
        if ids.is_empty() {
            return;
        }
        self.send(CoordinatorMessage::Enqueue(ids));
    }

    /// Queue a single resource.
    pub fn enqueue_one(&self, id: ResourceId) {
        self.enqueue(std::iter::once(id));
    }

    /// Latest cached record, `None` if the resource was never fetched.
    pub fn status(&self, id: ResourceId) -> Option<StatusRecord> {
        self.cache.get(id)
    }

    /// Latest cached status, [`SourceStatus::Unknown`] if never fetched.
    pub fn status_of(&self, id: ResourceId) -> SourceStatus {
        self.cache.status(id)
    }

    /// Re-arm polling.
    ///
    /// Shared mode re-polls every cached resource; scoped mode lets
    /// previously resolved resources be enqueued again.
    pub fn reload(&self) {
        self.send(CoordinatorMessage::Reload);
    }

    /// Clear the cache, the queue and any pending timer.
    pub fn reset(&self) {
        self.send(CoordinatorMessage::Reset);
    }

    /// Query the coordinator's current state.
    pub async fn state(&self) -> Result<CoordinatorState> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetState(reply_tx))
            .map_err(|_| Error::CoordinatorStopped)?;
        reply_rx.await.map_err(|_| Error::CoordinatorStopped)
    }

    /// Subscribe to status change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.cache.subscribe()
    }

    /// The shared status cache.
    pub fn cache(&self) -> Arc<StatusCache> {
        Arc::clone(&self.cache)
    }

    /// Tear the coordinator down.
    ///
    /// Pending timers are dropped and the result of an in-flight batch is
    /// ignored. The cache stays readable.
    pub fn dispose(&self) {
        if !self.cancellation_token.is_cancelled() {
            trace!("Disposing StatusCoordinator {}", self.name);
        }
        self.cancellation_token.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancellation_token.is_cancelled() || self.sender.is_closed()
    }

    /// A guard that disposes the coordinator when dropped.
    ///
    /// Keep it in the owning consumer to tie the coordinator to its lifetime.
    pub fn drop_guard(&self) -> DropGuard {
        self.cancellation_token.clone().drop_guard()
    }

    fn send(&self, msg: CoordinatorMessage) {
        if self.cancellation_token.is_cancelled() {
            return;
        }
        if self.sender.send(msg).is_err() {
            trace!("StatusCoordinator {} has stopped, message dropped", self.name);
        }
    }
}

impl fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("name", &self.name)
            .field("cached", &self.cache.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
