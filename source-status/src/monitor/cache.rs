//! Status cache.
//!
//! Holds the latest [`StatusRecord`] per resource. The coordinator is the only
//! writer; reads are synchronous and may come from any thread. A whole batch is
//! merged under one write lock, so readers see either the previous cycle or the
//! completed new one.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use super::events::{StatusEvent, StatusEventBroadcaster};
use crate::domain::{ResourceId, SourceStatus, StatusRecord};

/// Thread-safe cache of the latest known status per resource.
pub struct StatusCache {
    entries: RwLock<HashMap<ResourceId, StatusRecord>>,
    events: StatusEventBroadcaster,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::with_broadcaster(StatusEventBroadcaster::new())
    }

    pub fn with_broadcaster(events: StatusEventBroadcaster) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Latest record for a resource, if it has ever been fetched.
    pub fn get(&self, id: ResourceId) -> Option<StatusRecord> {
        self.entries.read().get(&id).cloned()
    }

    /// Latest status for a resource, [`SourceStatus::Unknown`] if never fetched.
    pub fn status(&self, id: ResourceId) -> SourceStatus {
        self.entries
            .read()
            .get(&id)
            .map(|record| record.status)
            .unwrap_or_default()
    }

    /// Ids of every cached resource, sorted.
    pub fn ids(&self) -> Vec<ResourceId> {
        let mut ids: Vec<_> = self.entries.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Copy of the whole cache.
    pub fn snapshot(&self) -> HashMap<ResourceId, StatusRecord> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Merge the result of one fetch cycle.
    ///
    /// The map key wins over the record's own `resource_id`. Publishes a
    /// [`StatusEvent::Updated`] once the whole batch is visible. Returns the
    /// number of records merged.
    pub fn merge(&self, records: HashMap<ResourceId, StatusRecord>) -> usize {
        if records.is_empty() {
            return 0;
        }

        let mut merged = Vec::with_capacity(records.len());
        {
            let mut entries = self.entries.write();
            for (id, mut record) in records {
                if !id.is_valid() {
                    continue;
                }
                record.resource_id = id;
                entries.insert(id, record.clone());
                merged.push(record);
            }
        }

        let count = merged.len();
        if count > 0 {
            merged.sort_unstable_by_key(|record| record.resource_id);
            self.events.publish(StatusEvent::Updated {
                records: merged,
                timestamp: Utc::now(),
            });
        }
        count
    }

    /// Drop every entry and publish [`StatusEvent::Cleared`].
    pub fn clear(&self) {
        self.entries.write().clear();
        self.events.publish(StatusEvent::Cleared {
            timestamp: Utc::now(),
        });
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    pub(crate) fn broadcaster(&self) -> &StatusEventBroadcaster {
        &self.events
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCache")
            .field("entries", &self.len())
            .field("subscribers", &self.events.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(entries: &[(i64, SourceStatus)]) -> HashMap<ResourceId, StatusRecord> {
        entries
            .iter()
            .map(|(id, status)| {
                let id = ResourceId::new(*id);
                (id, StatusRecord::new(id, *status))
            })
            .collect()
    }

    #[test]
    fn test_get_missing() {
        let cache = StatusCache::new();
        assert_eq!(cache.get(ResourceId::new(1)), None);
        assert_eq!(cache.status(ResourceId::new(1)), SourceStatus::Unknown);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let cache = StatusCache::new();
        cache.merge(batch(&[(1, SourceStatus::Testing), (2, SourceStatus::Active)]));
        cache.merge(batch(&[(1, SourceStatus::Inactive)]));

        assert_eq!(cache.status(ResourceId::new(1)), SourceStatus::Inactive);
        assert_eq!(cache.status(ResourceId::new(2)), SourceStatus::Active);
        assert_eq!(cache.ids(), vec![ResourceId::new(1), ResourceId::new(2)]);
    }

    #[test]
    fn test_merge_uses_map_key() {
        let cache = StatusCache::new();
        let mut records = HashMap::new();
        records.insert(
            ResourceId::new(5),
            StatusRecord::new(ResourceId::new(99), SourceStatus::Active),
        );
        cache.merge(records);

        let record = cache.get(ResourceId::new(5)).unwrap();
        assert_eq!(record.resource_id, ResourceId::new(5));
        assert!(cache.get(ResourceId::new(99)).is_none());
    }

    #[test]
    fn test_merge_skips_invalid_ids() {
        let cache = StatusCache::new();
        let merged = cache.merge(batch(&[(0, SourceStatus::Active), (1, SourceStatus::Active)]));
        assert_eq!(merged, 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_publishes_one_event_per_batch() {
        let cache = StatusCache::new();
        let mut events = cache.subscribe();

        cache.merge(batch(&[(2, SourceStatus::Active), (1, SourceStatus::Testing)]));

        match events.recv().await.unwrap() {
            StatusEvent::Updated { records, .. } => {
                let ids: Vec<_> = records.iter().map(|r| r.resource_id.get()).collect();
                assert_eq!(ids, vec![1, 2]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_merge_is_silent() {
        let cache = StatusCache::new();
        let mut events = cache.subscribe();
        assert_eq!(cache.merge(HashMap::new()), 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = StatusCache::new();
        cache.merge(batch(&[(1, SourceStatus::Active)]));
        let mut events = cache.subscribe();

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.status(ResourceId::new(1)), SourceStatus::Unknown);
        assert!(matches!(
            events.recv().await.unwrap(),
            StatusEvent::Cleared { .. }
        ));
    }
}
