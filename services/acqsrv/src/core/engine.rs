//! Process-wide orchestrator.
//!
//! Owns the bus sessions (one per enabled node), the latest-value cache,
//! the broadcaster, and the archiver. External commands route through here
//! to the owning session's command channel; across nodes everything is
//! independent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use gridlink_model::{state_event, Event, MessageLevel, ScalarValue};
use gridlink_rtdb::ValueCache;
use gridlink_store::{StoreAdapter, MIN_ARCHIVE_INTERVAL_MS, SETTING_ARCHIVE_INTERVAL};

use crate::core::archiver::{self, ArchiverHandle};
use crate::core::broadcaster::{Broadcaster, ObserverId};
use crate::core::session::{self, SessionContext, SessionHandle, StatusBoard};
use crate::error::{AcqError, Result};
use crate::modbus::codec;
use crate::transport::TransportFactory;

pub struct Engine {
    store: Arc<dyn StoreAdapter>,
    cache: Arc<ValueCache>,
    broadcaster: Arc<Broadcaster>,
    status: Arc<StatusBoard>,
    transports: Arc<dyn TransportFactory>,
    running: Arc<AtomicBool>,
    sessions: Mutex<HashMap<i64, SessionHandle>>,
    archiver: Mutex<Option<ArchiverHandle>>,
}

impl Engine {
    pub fn new(store: Arc<dyn StoreAdapter>, transports: Arc<dyn TransportFactory>) -> Self {
        Self {
            store,
            cache: Arc::new(ValueCache::new()),
            broadcaster: Arc::new(Broadcaster::new()),
            status: Arc::new(StatusBoard::default()),
            transports,
            running: Arc::new(AtomicBool::new(false)),
            sessions: Mutex::new(HashMap::new()),
            archiver: Mutex::new(None),
        }
    }

    pub fn cache(&self) -> &Arc<ValueCache> {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn session_context(&self) -> SessionContext {
        SessionContext {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            broadcaster: Arc::clone(&self.broadcaster),
            status: Arc::clone(&self.status),
            transports: Arc::clone(&self.transports),
            running: Arc::clone(&self.running),
        }
    }

    /// Start every enabled node's session and the archiver. Idempotent; a
    /// node that fails to open does not prevent the others.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            info!("engine already running");
            return Ok(());
        }

        let nodes = match self.store.list_enabled_nodes_with_children().await {
            Ok(nodes) => nodes,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e.into());
            },
        };

        info!(nodes = nodes.len(), "engine starting");
        {
            let mut sessions = self.sessions.lock().await;
            for tree in nodes {
                let node_id = tree.node.id;
                sessions.insert(node_id, session::spawn(tree, self.session_context()));
            }
        }

        let mut archiver = self.archiver.lock().await;
        if archiver.is_none() {
            *archiver = Some(archiver::spawn(
                Arc::clone(&self.store),
                Arc::clone(&self.cache),
            ));
        }
        Ok(())
    }

    /// Stop the archiver and every session; previously Connected nodes
    /// become Disconnected. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::AcqRel) {
            info!("engine already stopped");
            return Ok(());
        }

        if let Some(archiver) = self.archiver.lock().await.take() {
            archiver.stop();
        }

        let sessions: Vec<SessionHandle> = {
            let mut guard = self.sessions.lock().await;
            guard.drain().map(|(_, handle)| handle).collect()
        };
        for handle in sessions {
            handle.shutdown().await;
        }
        self.cache.clear();

        info!("engine stopped");
        self.publish_state().await;
        Ok(())
    }

    /// Tear down and (when engine and node are enabled) rebuild one node's
    /// session from current configuration.
    pub async fn reload_node(&self, node_id: i64) -> Result<()> {
        let existing = self.sessions.lock().await.remove(&node_id);
        if let Some(handle) = existing {
            handle.shutdown().await;
        }

        let tree = match self.store.get_node_with_children(node_id).await {
            Ok(tree) => tree,
            Err(gridlink_store::StoreError::NotFound { .. }) => {
                // node deleted: the torn-down session is all there was
                info!(node_id, "reload: node no longer exists");
                self.publish_state().await;
                return Ok(());
            },
            Err(e) => return Err(e.into()),
        };

        for entry in &tree.devices {
            self.cache.evict_device(entry.device.id);
        }

        if self.is_running() && tree.node.enabled {
            info!(node_id, "reload: restarting session");
            self.sessions
                .lock()
                .await
                .insert(node_id, session::spawn(tree, self.session_context()));
        } else {
            info!(node_id, "reload: session not restarted");
            self.publish_state().await;
        }
        Ok(())
    }

    /// Restart polling of one device from fresh store state.
    pub async fn reconnect_device(&self, device_id: i64) -> Result<()> {
        let device = self.store.get_device(device_id).await?;
        let client = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(&device.node_id)
                .map(|handle| handle.client())
                .ok_or_else(|| {
                    AcqError::NotConnected(format!(
                        "no running session for node {}",
                        device.node_id
                    ))
                })?
        };
        client.reconnect_device(device_id).await
    }

    /// Synchronous write; returns the value read back from the device.
    pub async fn write_tag(&self, tag_id: i64, value: &serde_json::Value) -> Result<ScalarValue> {
        let value = codec::parse_write_value(value)?;
        let tag = self.store.get_tag(tag_id).await?;
        let device = self.store.get_device(tag.device_id).await?;

        let client = {
            let sessions = self.sessions.lock().await;
            sessions
                .get(&device.node_id)
                .map(|handle| handle.client())
                .ok_or_else(|| {
                    AcqError::NotConnected(format!(
                        "no running session for node {}",
                        device.node_id
                    ))
                })?
        };
        client.write_tag(tag_id, value).await
    }

    /// Current full-system snapshot as a `state` event.
    pub async fn snapshot(&self) -> Result<Event> {
        let mut nodes = self.store.list_nodes_with_children().await?;
        self.status.overlay(&mut nodes);
        Ok(state_event(self.is_running(), &nodes))
    }

    /// Subscribe an observer; it immediately receives a `state` snapshot.
    pub async fn subscribe(&self) -> (ObserverId, tokio::sync::mpsc::Receiver<Event>) {
        let (id, rx) = self.broadcaster.subscribe();
        match self.snapshot().await {
            Ok(event) => self.broadcaster.send_to(id, event),
            Err(e) => error!("initial snapshot unavailable: {e}"),
        }
        (id, rx)
    }

    pub fn unsubscribe(&self, id: ObserverId) {
        self.broadcaster.unsubscribe(id);
    }

    /// Post a user-facing notification to all observers.
    pub fn notify(&self, level: MessageLevel, title: &str, description: &str) {
        self.broadcaster
            .publish(Event::message(level, title, description));
    }

    pub async fn archive_interval(&self) -> u64 {
        gridlink_store::archive_interval_ms(self.store.as_ref()).await
    }

    /// Update the archiver cadence; takes effect at the next tick.
    pub async fn set_archive_interval(&self, interval_ms: u64) -> Result<()> {
        if interval_ms < MIN_ARCHIVE_INTERVAL_MS {
            return Err(AcqError::InvalidValue(format!(
                "archive interval must be at least {MIN_ARCHIVE_INTERVAL_MS} ms"
            )));
        }
        self.store
            .set_setting(SETTING_ARCHIVE_INTERVAL, &interval_ms.to_string())
            .await?;
        Ok(())
    }

    async fn publish_state(&self) {
        match self.snapshot().await {
            Ok(event) => self.broadcaster.publish(event),
            Err(e) => warn!("state broadcast skipped: {e}"),
        }
    }
}
