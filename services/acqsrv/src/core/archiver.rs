//! Periodic archival of cached samples into the historical store.
//!
//! On each tick, every enabled tag of every enabled device contributes one
//! history record if its cached sample holds a value. The cadence comes
//! from the `archiveInterval` setting and is re-read every cycle, so a
//! changed setting takes effect at the next tick boundary.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use gridlink_rtdb::ValueCache;
use gridlink_store::{archive_interval_ms, StoreAdapter};

pub(crate) struct ArchiverHandle {
    task: JoinHandle<()>,
}

impl ArchiverHandle {
    pub(crate) fn stop(self) {
        self.task.abort();
        info!("archiver stopped");
    }
}

pub(crate) fn spawn(store: Arc<dyn StoreAdapter>, cache: Arc<ValueCache>) -> ArchiverHandle {
    let task = tokio::spawn(async move {
        info!("archiver started");
        loop {
            let interval = archive_interval_ms(store.as_ref()).await;
            sleep(Duration::from_millis(interval)).await;
            match tick(store.as_ref(), &cache).await {
                Ok(appended) => debug!(appended, "archive tick"),
                Err(e) => warn!("archive tick failed: {e}"),
            }
        }
    });
    ArchiverHandle { task }
}

/// One archive pass; returns the number of records appended.
async fn tick(store: &dyn StoreAdapter, cache: &ValueCache) -> gridlink_store::Result<usize> {
    let nodes = store.list_enabled_nodes_with_children().await?;
    let now = chrono::Utc::now();
    let mut appended = 0usize;

    for node in &nodes {
        for entry in &node.devices {
            if !entry.device.enabled {
                continue;
            }
            for tag in entry.enabled_tags() {
                let Some(sample) = cache.get(entry.device.id, tag.id) else {
                    continue;
                };
                let (Some(value), None) = (sample.value, &sample.error) else {
                    continue;
                };
                match store
                    .append_history(entry.device.id, tag.id, &value.to_string(), now)
                    .await
                {
                    Ok(()) => appended += 1,
                    Err(e) => warn!(tag = tag.id, "history append failed: {e}"),
                }
            }
        }
    }
    Ok(appended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_model::{
        AccessMode, ConnectionNode, ConnectionStatus, DataType, Device, Parity, RegisterKind,
        Sample, ScalarValue, Tag,
    };
    use gridlink_store::{MemoryStore, SETTING_ARCHIVE_INTERVAL};

    fn store_with_tag() -> (Arc<MemoryStore>, i64, i64) {
        let store = MemoryStore::new();
        let node_id = store.add_node(ConnectionNode {
            id: 0,
            name: "bus".to_string(),
            com_port: "/dev/ttyS0".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            enabled: true,
            connection_status: ConnectionStatus::Connected,
            last_error: None,
        });
        let device_id = store.add_device(Device {
            id: 0,
            node_id,
            name: "meter".to_string(),
            address: 17,
            response_timeout_ms: 1000,
            poll_interval_ms: 1000,
            enabled: true,
            last_poll_time: None,
        });
        let tag_id = store.add_tag(Tag {
            id: 0,
            device_id,
            name: "temperature".to_string(),
            address: 1,
            register_kind: RegisterKind::HoldingRegister,
            device_data_type: DataType::I16,
            server_data_type: DataType::I32,
            access: AccessMode::ReadOnly,
            enabled: true,
        });
        (Arc::new(store), device_id, tag_id)
    }

    #[tokio::test]
    async fn tick_archives_good_samples_only() {
        let (store, device_id, tag_id) = store_with_tag();
        let cache = ValueCache::new();

        // no sample yet: nothing to archive
        assert_eq!(tick(store.as_ref(), &cache).await.unwrap(), 0);

        cache.upsert(Sample::ok(tag_id, device_id, ScalarValue::Integer(42)));
        assert_eq!(tick(store.as_ref(), &cache).await.unwrap(), 1);
        let rows = store.history_for(tag_id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "42");

        // an errored sample is skipped
        cache.upsert(Sample::failed(tag_id, device_id, "device response timeout"));
        assert_eq!(tick(store.as_ref(), &cache).await.unwrap(), 0);
        assert_eq!(store.history_for(tag_id).len(), 1);
    }

    #[tokio::test]
    async fn disabled_entities_are_skipped() {
        let (store, device_id, tag_id) = store_with_tag();
        let cache = ValueCache::new();
        cache.upsert(Sample::ok(tag_id, device_id, ScalarValue::Integer(7)));

        store.set_tag_enabled(tag_id, false);
        assert_eq!(tick(store.as_ref(), &cache).await.unwrap(), 0);

        store.set_tag_enabled(tag_id, true);
        store.set_device_enabled(device_id, false);
        assert_eq!(tick(store.as_ref(), &cache).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cadence_follows_setting() {
        let (store, device_id, tag_id) = store_with_tag();
        store
            .set_setting(SETTING_ARCHIVE_INTERVAL, "1000")
            .await
            .unwrap();
        let cache = Arc::new(ValueCache::new());
        cache.upsert(Sample::ok(tag_id, device_id, ScalarValue::Integer(42)));

        let handle = spawn(store.clone(), cache);
        tokio::time::sleep(Duration::from_millis(3500)).await;
        handle.stop();

        let rows = store.history_for(tag_id);
        assert!(
            (3..=4).contains(&rows.len()),
            "expected ~3 archive rows, got {}",
            rows.len()
        );
        assert!(rows.iter().all(|r| r.value == "42"));
    }
}
