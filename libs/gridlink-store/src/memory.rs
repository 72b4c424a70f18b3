//! In-memory store adapter for engine tests.
//!
//! Mirrors the SQLite adapter's behavior (cascading structure, enabled
//! filtering, upsert settings) over plain maps, plus mutators tests use to
//! reconfigure entities between polls.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use gridlink_model::{
    ConnectionNode, ConnectionStatus, Device, DeviceWithTags, HistoryRecord, NodeWithChildren, Tag,
};

use crate::{Result, StoreAdapter, StoreError};

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<i64, ConnectionNode>,
    devices: BTreeMap<i64, Device>,
    tags: BTreeMap<i64, Tag>,
    history: Vec<HistoryRecord>,
    settings: HashMap<String, String>,
    next_id: i64,
}

impl Inner {
    fn node_with_children(&self, node: &ConnectionNode) -> NodeWithChildren {
        let devices = self
            .devices
            .values()
            .filter(|d| d.node_id == node.id)
            .map(|d| DeviceWithTags {
                device: d.clone(),
                tags: self
                    .tags
                    .values()
                    .filter(|t| t.device_id == d.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        NodeWithChildren {
            node: node.clone(),
            devices,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, mut node: ConnectionNode) -> i64 {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        node.id = inner.next_id;
        let id = node.id;
        inner.nodes.insert(id, node);
        id
    }

    pub fn add_device(&self, mut device: Device) -> i64 {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        device.id = inner.next_id;
        let id = device.id;
        inner.devices.insert(id, device);
        id
    }

    pub fn add_tag(&self, mut tag: Tag) -> i64 {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        tag.id = inner.next_id;
        let id = tag.id;
        inner.tags.insert(id, tag);
        id
    }

    pub fn set_device_enabled(&self, id: i64, enabled: bool) {
        if let Some(device) = self.inner.write().devices.get_mut(&id) {
            device.enabled = enabled;
        }
    }

    pub fn set_tag_enabled(&self, id: i64, enabled: bool) {
        if let Some(tag) = self.inner.write().tags.get_mut(&id) {
            tag.enabled = enabled;
        }
    }

    pub fn remove_tag(&self, id: i64) {
        self.inner.write().tags.remove(&id);
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.inner.read().history.clone()
    }

    pub fn history_for(&self, tag_id: i64) -> Vec<HistoryRecord> {
        self.inner
            .read()
            .history
            .iter()
            .filter(|r| r.tag_id == tag_id)
            .cloned()
            .collect()
    }

    pub fn node_status(&self, id: i64) -> Option<(ConnectionStatus, Option<String>)> {
        self.inner
            .read()
            .nodes
            .get(&id)
            .map(|n| (n.connection_status, n.last_error.clone()))
    }

    pub fn device_last_poll(&self, id: i64) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .devices
            .get(&id)
            .and_then(|d| d.last_poll_time)
    }
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    async fn list_nodes_with_children(&self) -> Result<Vec<NodeWithChildren>> {
        let inner = self.inner.read();
        Ok(inner
            .nodes
            .values()
            .map(|n| inner.node_with_children(n))
            .collect())
    }

    async fn list_enabled_nodes_with_children(&self) -> Result<Vec<NodeWithChildren>> {
        let inner = self.inner.read();
        Ok(inner
            .nodes
            .values()
            .filter(|n| n.enabled)
            .map(|n| inner.node_with_children(n))
            .collect())
    }

    async fn get_node_with_children(&self, node_id: i64) -> Result<NodeWithChildren> {
        let inner = self.inner.read();
        let node = inner.nodes.get(&node_id).ok_or(StoreError::NotFound {
            entity: "node",
            id: node_id,
        })?;
        Ok(inner.node_with_children(node))
    }

    async fn get_node(&self, id: i64) -> Result<ConnectionNode> {
        self.inner
            .read()
            .nodes
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "node",
                id,
            })
    }

    async fn get_device(&self, id: i64) -> Result<Device> {
        self.inner
            .read()
            .devices
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "device",
                id,
            })
    }

    async fn get_tag(&self, id: i64) -> Result<Tag> {
        self.inner
            .read()
            .tags
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "tag",
                id,
            })
    }

    async fn list_device_tags(&self, device_id: i64, only_enabled: bool) -> Result<Vec<Tag>> {
        Ok(self
            .inner
            .read()
            .tags
            .values()
            .filter(|t| t.device_id == device_id && (!only_enabled || t.enabled))
            .cloned()
            .collect())
    }

    async fn set_node_connection_status(
        &self,
        id: i64,
        status: ConnectionStatus,
        last_error: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let node = inner.nodes.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "node",
            id,
        })?;
        node.connection_status = status;
        node.last_error = last_error.map(str::to_string);
        Ok(())
    }

    async fn set_device_last_poll_time(&self, id: i64, timestamp: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write();
        let device = inner.devices.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "device",
            id,
        })?;
        device.last_poll_time = Some(timestamp);
        Ok(())
    }

    async fn append_history(
        &self,
        device_id: i64,
        tag_id: i64,
        value: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.inner.write().history.push(HistoryRecord {
            device_id,
            tag_id,
            value: value.to_string(),
            timestamp,
        });
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.read().settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.inner
            .write()
            .settings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
