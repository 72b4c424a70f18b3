//! Real-time latest-value store.
//!
//! Per (device, tag), the most recent [`Sample`] is retained. Bus sessions
//! are the only writers for their own devices; the archiver and snapshot
//! builders read cloned snapshots, so readers never block the polling path
//! for longer than one shard lock.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use gridlink_model::Sample;

/// Process-local cache of the latest sample per tag, grouped by device.
#[derive(Debug, Default)]
pub struct ValueCache {
    devices: DashMap<i64, HashMap<i64, Sample>>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest sample for its (device, tag) slot.
    pub fn upsert(&self, sample: Sample) {
        self.devices
            .entry(sample.device_id)
            .or_default()
            .insert(sample.tag_id, sample);
    }

    /// Latest sample for one tag, if any attempt has completed.
    pub fn get(&self, device_id: i64, tag_id: i64) -> Option<Sample> {
        self.devices
            .get(&device_id)
            .and_then(|tags| tags.get(&tag_id).cloned())
    }

    /// Clone of one device's samples.
    pub fn device_snapshot(&self, device_id: i64) -> HashMap<i64, Sample> {
        self.devices
            .get(&device_id)
            .map(|tags| tags.clone())
            .unwrap_or_default()
    }

    /// Clone of the whole cache.
    pub fn snapshot(&self) -> HashMap<i64, HashMap<i64, Sample>> {
        self.devices
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Drop all samples of a device (device or node teardown).
    pub fn evict_device(&self, device_id: i64) {
        self.devices.remove(&device_id);
    }

    /// Drop samples of tags no longer configured for a device.
    pub fn retain_tags(&self, device_id: i64, keep: &HashSet<i64>) {
        if let Some(mut tags) = self.devices.get_mut(&device_id) {
            tags.retain(|tag_id, _| keep.contains(tag_id));
        }
    }

    pub fn clear(&self) {
        self.devices.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_model::ScalarValue;

    #[test]
    fn upsert_replaces_latest() {
        let cache = ValueCache::new();
        cache.upsert(Sample::ok(10, 1, ScalarValue::Integer(1)));
        cache.upsert(Sample::ok(10, 1, ScalarValue::Integer(2)));

        let sample = cache.get(1, 10).unwrap();
        assert_eq!(sample.value, Some(ScalarValue::Integer(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_sample_overwrites_value() {
        let cache = ValueCache::new();
        cache.upsert(Sample::ok(10, 1, ScalarValue::Integer(1)));
        cache.upsert(Sample::failed(10, 1, "device response timeout"));

        let sample = cache.get(1, 10).unwrap();
        assert!(sample.value.is_none());
        assert!(sample.error.as_deref().unwrap().contains("timeout"));
    }

    #[test]
    fn snapshot_is_detached() {
        let cache = ValueCache::new();
        cache.upsert(Sample::ok(10, 1, ScalarValue::Integer(1)));

        let snap = cache.device_snapshot(1);
        cache.upsert(Sample::ok(10, 1, ScalarValue::Integer(99)));

        assert_eq!(snap[&10].value, Some(ScalarValue::Integer(1)));
    }

    #[test]
    fn eviction() {
        let cache = ValueCache::new();
        cache.upsert(Sample::ok(10, 1, ScalarValue::Integer(1)));
        cache.upsert(Sample::ok(11, 1, ScalarValue::Integer(2)));
        cache.upsert(Sample::ok(20, 2, ScalarValue::Integer(3)));

        let keep: HashSet<i64> = [11].into_iter().collect();
        cache.retain_tags(1, &keep);
        assert!(cache.get(1, 10).is_none());
        assert!(cache.get(1, 11).is_some());

        cache.evict_device(2);
        assert!(cache.get(2, 20).is_none());
        assert_eq!(cache.len(), 1);
    }
}
