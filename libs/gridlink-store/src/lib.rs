//! Store adapter: the narrow persistence interface the engine consumes.
//!
//! The engine is store-agnostic; it sees configuration entities, history
//! appends, and a key-value settings table through [`StoreAdapter`]. The
//! SQLite implementation backs production; the in-memory implementation
//! backs engine tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use gridlink_model::{ConnectionNode, ConnectionStatus, Device, NodeWithChildren, Tag};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Recognized settings key for the archiver cadence, milliseconds.
pub const SETTING_ARCHIVE_INTERVAL: &str = "archiveInterval";

/// Default archiver cadence when the setting is absent or unparseable.
pub const DEFAULT_ARCHIVE_INTERVAL_MS: u64 = 60_000;

/// Lower bound for the archiver cadence.
pub const MIN_ARCHIVE_INTERVAL_MS: u64 = 1_000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid stored value: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence interface consumed by the engine.
///
/// All operations are fallible; the engine degrades gracefully on
/// persistence errors for poll timestamps, history appends, and status
/// writes.
#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// All nodes with their full device/tag trees (for state snapshots).
    async fn list_nodes_with_children(&self) -> Result<Vec<NodeWithChildren>>;

    /// Enabled nodes with their full device/tag trees (for engine start).
    async fn list_enabled_nodes_with_children(&self) -> Result<Vec<NodeWithChildren>>;

    /// One node with its device/tag tree (for node reload).
    async fn get_node_with_children(&self, node_id: i64) -> Result<NodeWithChildren>;

    async fn get_node(&self, id: i64) -> Result<ConnectionNode>;

    async fn get_device(&self, id: i64) -> Result<Device>;

    async fn get_tag(&self, id: i64) -> Result<Tag>;

    /// Current tag list for a device, optionally restricted to enabled tags.
    async fn list_device_tags(&self, device_id: i64, only_enabled: bool) -> Result<Vec<Tag>>;

    async fn set_node_connection_status(
        &self,
        id: i64,
        status: ConnectionStatus,
        last_error: Option<&str>,
    ) -> Result<()>;

    async fn set_device_last_poll_time(&self, id: i64, timestamp: DateTime<Utc>) -> Result<()>;

    async fn append_history(
        &self,
        device_id: i64,
        tag_id: i64,
        value: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}

/// Read the archiver cadence from settings, clamped to the minimum.
pub async fn archive_interval_ms(store: &dyn StoreAdapter) -> u64 {
    match store.get_setting(SETTING_ARCHIVE_INTERVAL).await {
        Ok(Some(raw)) => raw
            .parse::<u64>()
            .map(|ms| ms.max(MIN_ARCHIVE_INTERVAL_MS))
            .unwrap_or(DEFAULT_ARCHIVE_INTERVAL_MS),
        Ok(None) => DEFAULT_ARCHIVE_INTERVAL_MS,
        Err(e) => {
            tracing::warn!("failed to read {SETTING_ARCHIVE_INTERVAL}: {e}");
            DEFAULT_ARCHIVE_INTERVAL_MS
        },
    }
}
