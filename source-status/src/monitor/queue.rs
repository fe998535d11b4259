//! Poll queue and resolution tracking.
//!
//! The [`PollQueue`] holds every resource that still needs a status fetch.
//! Ids stay queued while their batch is in flight and only leave the queue
//! once a fetch reports a terminal status for them, so a failed cycle never
//! loses work.

use std::collections::{HashSet, VecDeque};

use crate::domain::ResourceId;

/// Deduplicating FIFO of resources awaiting a fetch.
#[derive(Debug, Default, Clone)]
pub struct PollQueue {
    order: VecDeque<ResourceId>,
    members: HashSet<ResourceId>,
}

impl PollQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an id.
    ///
    /// Returns `false` if the id is invalid or already queued.
    pub fn push(&mut self, id: ResourceId) -> bool {
        if !id.is_valid() || !self.members.insert(id) {
            return false;
        }
        self.order.push_back(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Up to `max` ids from the front of the queue. The ids stay queued.
    pub fn peek_batch(&self, max: usize) -> Vec<ResourceId> {
        self.order.iter().take(max).copied().collect()
    }

    /// Drop resolved ids from the queue.
    pub fn remove_all(&mut self, ids: &[ResourceId]) {
        let mut removed = 0;
        for id in ids {
            if self.members.remove(id) {
                removed += 1;
            }
        }
        if removed > 0 {
            self.order.retain(|id| self.members.contains(id));
        }
    }

    /// Move still-queued ids to the back so the rest of the queue gets a turn.
    pub fn rotate_to_back(&mut self, ids: &[ResourceId]) {
        let rotate: HashSet<ResourceId> = ids
            .iter()
            .copied()
            .filter(|id| self.members.contains(id))
            .collect();
        if rotate.is_empty() || rotate.len() == self.order.len() {
            return;
        }

        let mut moved = Vec::with_capacity(rotate.len());
        self.order.retain(|id| {
            if rotate.contains(id) {
                moved.push(*id);
                false
            } else {
                true
            }
        });
        self.order.extend(moved);
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

/// Ids whose last fetch returned a terminal status.
///
/// Only consulted in scoped mode, where it stops a consumer from re-polling
/// sources it has already resolved until it explicitly reloads.
#[derive(Debug, Default, Clone)]
pub struct ResolvedSet {
    ids: HashSet<ResourceId>,
}

impl ResolvedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, ids: impl IntoIterator<Item = ResourceId>) {
        self.ids.extend(ids);
    }

    pub fn contains(&self, id: ResourceId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
