//! SQLite-backed store adapter.
//!
//! WAL journal mode with a busy timeout and foreign keys ON; deletes of
//! nodes and devices cascade to their children. The schema is bootstrapped
//! idempotently so a fresh database file is usable immediately.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use tracing::info;

use gridlink_model::{
    AccessMode, ConnectionNode, ConnectionStatus, DataType, Device, DeviceWithTags,
    NodeWithChildren, Parity, RegisterKind, Tag,
};

use crate::{Result, StoreAdapter, StoreError};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS connection_nodes (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    name              TEXT NOT NULL,
    com_port          TEXT NOT NULL,
    baud_rate         INTEGER NOT NULL DEFAULT 9600,
    data_bits         INTEGER NOT NULL DEFAULT 8,
    stop_bits         INTEGER NOT NULL DEFAULT 1,
    parity            TEXT NOT NULL DEFAULT 'none',
    enabled           INTEGER NOT NULL DEFAULT 1,
    connection_status TEXT NOT NULL DEFAULT 'Disconnected',
    last_error        TEXT
);

CREATE TABLE IF NOT EXISTS devices (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    node_id             INTEGER NOT NULL REFERENCES connection_nodes(id) ON DELETE CASCADE,
    name                TEXT NOT NULL,
    address             INTEGER NOT NULL,
    response_timeout_ms INTEGER NOT NULL DEFAULT 1000,
    poll_interval_ms    INTEGER NOT NULL DEFAULT 1000,
    enabled             INTEGER NOT NULL DEFAULT 1,
    last_poll_time      TEXT
);

CREATE TABLE IF NOT EXISTS tags (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id        INTEGER NOT NULL REFERENCES devices(id) ON DELETE CASCADE,
    name             TEXT NOT NULL,
    address          INTEGER NOT NULL,
    register_kind    TEXT NOT NULL,
    device_data_type TEXT NOT NULL,
    server_data_type TEXT NOT NULL,
    access           TEXT NOT NULL DEFAULT 'ReadOnly',
    enabled          INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS history_data (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id INTEGER NOT NULL,
    tag_id    INTEGER NOT NULL,
    value     TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_tag_time ON history_data(tag_id, timestamp);

CREATE TABLE IF NOT EXISTS system_settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) a database file and bootstrap the schema.
    pub async fn connect(db_path: impl AsRef<Path>) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Invalid(format!("create {parent:?}: {e}")))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("sqlite store ready: {}", path.display());
        Ok(store)
    }

    /// In-memory database, for tests. The pool pins its single connection;
    /// letting it close would discard the database.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(StoreError::Database)?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // Insert helpers used by provisioning tooling and tests. The CRUD API
    // surface proper lives outside this crate.

    pub async fn insert_node(&self, node: &ConnectionNode) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO connection_nodes \
             (name, com_port, baud_rate, data_bits, stop_bits, parity, enabled, connection_status, last_error) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&node.name)
        .bind(&node.com_port)
        .bind(node.baud_rate)
        .bind(node.data_bits)
        .bind(node.stop_bits)
        .bind(node.parity.as_str())
        .bind(node.enabled)
        .bind(node.connection_status.as_str())
        .bind(&node.last_error)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    pub async fn insert_device(&self, device: &Device) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO devices \
             (node_id, name, address, response_timeout_ms, poll_interval_ms, enabled, last_poll_time) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(device.node_id)
        .bind(&device.name)
        .bind(device.address)
        .bind(device.response_timeout_ms as i64)
        .bind(device.poll_interval_ms as i64)
        .bind(device.enabled)
        .bind(device.last_poll_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    pub async fn insert_tag(&self, tag: &Tag) -> Result<i64> {
        let row = sqlx::query(
            "INSERT INTO tags \
             (device_id, name, address, register_kind, device_data_type, server_data_type, access, enabled) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(tag.device_id)
        .bind(&tag.name)
        .bind(tag.address)
        .bind(tag.register_kind.as_str())
        .bind(tag.device_data_type.as_str())
        .bind(tag.server_data_type.as_str())
        .bind(tag.access.as_str())
        .bind(tag.enabled)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>(0))
    }

    async fn devices_with_tags(&self, node_id: i64) -> Result<Vec<DeviceWithTags>> {
        let device_rows =
            sqlx::query("SELECT * FROM devices WHERE node_id = ? ORDER BY id")
                .bind(node_id)
                .fetch_all(&self.pool)
                .await?;

        let mut devices = Vec::with_capacity(device_rows.len());
        for row in device_rows {
            let device = device_from_row(&row)?;
            let tags = self.list_device_tags(device.id, false).await?;
            devices.push(DeviceWithTags { device, tags });
        }
        Ok(devices)
    }

    async fn nodes_with_children(&self, only_enabled: bool) -> Result<Vec<NodeWithChildren>> {
        let sql = if only_enabled {
            "SELECT * FROM connection_nodes WHERE enabled = 1 ORDER BY id"
        } else {
            "SELECT * FROM connection_nodes ORDER BY id"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            let node = node_from_row(&row)?;
            let devices = self.devices_with_tags(node.id).await?;
            nodes.push(NodeWithChildren { node, devices });
        }
        Ok(nodes)
    }
}

#[async_trait]
impl StoreAdapter for SqliteStore {
    async fn list_nodes_with_children(&self) -> Result<Vec<NodeWithChildren>> {
        self.nodes_with_children(false).await
    }

    async fn list_enabled_nodes_with_children(&self) -> Result<Vec<NodeWithChildren>> {
        self.nodes_with_children(true).await
    }

    async fn get_node_with_children(&self, node_id: i64) -> Result<NodeWithChildren> {
        let node = self.get_node(node_id).await?;
        let devices = self.devices_with_tags(node_id).await?;
        Ok(NodeWithChildren { node, devices })
    }

    async fn get_node(&self, id: i64) -> Result<ConnectionNode> {
        let row = sqlx::query("SELECT * FROM connection_nodes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "node",
                id,
            })?;
        node_from_row(&row)
    }

    async fn get_device(&self, id: i64) -> Result<Device> {
        let row = sqlx::query("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "device",
                id,
            })?;
        device_from_row(&row)
    }

    async fn get_tag(&self, id: i64) -> Result<Tag> {
        let row = sqlx::query("SELECT * FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "tag",
                id,
            })?;
        tag_from_row(&row)
    }

    async fn list_device_tags(&self, device_id: i64, only_enabled: bool) -> Result<Vec<Tag>> {
        let sql = if only_enabled {
            "SELECT * FROM tags WHERE device_id = ? AND enabled = 1 ORDER BY id"
        } else {
            "SELECT * FROM tags WHERE device_id = ? ORDER BY id"
        };
        let rows = sqlx::query(sql).bind(device_id).fetch_all(&self.pool).await?;
        rows.iter().map(tag_from_row).collect()
    }

    async fn set_node_connection_status(
        &self,
        id: i64,
        status: ConnectionStatus,
        last_error: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE connection_nodes SET connection_status = ?, last_error = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(last_error)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_device_last_poll_time(&self, id: i64, timestamp: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE devices SET last_poll_time = ? WHERE id = ?")
            .bind(timestamp)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn append_history(
        &self,
        device_id: i64,
        tag_id: i64,
        value: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO history_data (device_id, tag_id, value, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(device_id)
        .bind(tag_id)
        .bind(value)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM system_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO system_settings (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_field<T: FromStr<Err = String>>(raw: &str, field: &str) -> Result<T> {
    raw.parse()
        .map_err(|e| StoreError::Invalid(format!("{field}: {e}")))
}

fn node_from_row(row: &SqliteRow) -> Result<ConnectionNode> {
    let parity: String = row.try_get("parity")?;
    let status: String = row.try_get("connection_status")?;
    Ok(ConnectionNode {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        com_port: row.try_get("com_port")?,
        baud_rate: row.try_get::<i64, _>("baud_rate")? as u32,
        data_bits: row.try_get::<i64, _>("data_bits")? as u8,
        stop_bits: row.try_get::<i64, _>("stop_bits")? as u8,
        parity: parse_field::<Parity>(&parity, "parity")?,
        enabled: row.try_get("enabled")?,
        connection_status: parse_field::<ConnectionStatus>(&status, "connection_status")?,
        last_error: row.try_get("last_error")?,
    })
}

fn device_from_row(row: &SqliteRow) -> Result<Device> {
    Ok(Device {
        id: row.try_get("id")?,
        node_id: row.try_get("node_id")?,
        name: row.try_get("name")?,
        address: row.try_get::<i64, _>("address")? as u8,
        response_timeout_ms: row.try_get::<i64, _>("response_timeout_ms")? as u64,
        poll_interval_ms: row.try_get::<i64, _>("poll_interval_ms")? as u64,
        enabled: row.try_get("enabled")?,
        last_poll_time: row.try_get("last_poll_time")?,
    })
}

fn tag_from_row(row: &SqliteRow) -> Result<Tag> {
    let kind: String = row.try_get("register_kind")?;
    let device_type: String = row.try_get("device_data_type")?;
    let server_type: String = row.try_get("server_data_type")?;
    let access: String = row.try_get("access")?;
    Ok(Tag {
        id: row.try_get("id")?,
        device_id: row.try_get("device_id")?,
        name: row.try_get("name")?,
        address: row.try_get::<i64, _>("address")? as u16,
        register_kind: parse_field::<RegisterKind>(&kind, "register_kind")?,
        device_data_type: parse_field::<DataType>(&device_type, "device_data_type")?,
        server_data_type: parse_field::<DataType>(&server_type, "server_data_type")?,
        access: parse_field::<AccessMode>(&access, "access")?,
        enabled: row.try_get("enabled")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_model::ScalarValue;

    fn sample_node() -> ConnectionNode {
        ConnectionNode {
            id: 0,
            name: "bus-1".to_string(),
            com_port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
            enabled: true,
            connection_status: ConnectionStatus::Disconnected,
            last_error: None,
        }
    }

    fn sample_device(node_id: i64) -> Device {
        Device {
            id: 0,
            node_id,
            name: "meter".to_string(),
            address: 17,
            response_timeout_ms: 1000,
            poll_interval_ms: 1000,
            enabled: true,
            last_poll_time: None,
        }
    }

    fn sample_tag(device_id: i64) -> Tag {
        Tag {
            id: 0,
            device_id,
            name: "temperature".to_string(),
            address: 1,
            register_kind: RegisterKind::HoldingRegister,
            device_data_type: DataType::I16,
            server_data_type: DataType::I32,
            access: AccessMode::ReadWrite,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridlink.db");

        let store = SqliteStore::connect(&path).await.unwrap();
        let node_id = store.insert_node(&sample_node()).await.unwrap();
        assert!(path.exists());

        // reopening sees the persisted row
        drop(store);
        let store = SqliteStore::connect(&path).await.unwrap();
        assert_eq!(store.get_node(node_id).await.unwrap().name, "bus-1");
    }

    #[tokio::test]
    async fn roundtrip_entities() {
        let store = SqliteStore::connect_in_memory().await.unwrap();

        let node_id = store.insert_node(&sample_node()).await.unwrap();
        let device_id = store.insert_device(&sample_device(node_id)).await.unwrap();
        let tag_id = store.insert_tag(&sample_tag(device_id)).await.unwrap();

        let node = store.get_node(node_id).await.unwrap();
        assert_eq!(node.com_port, "/dev/ttyUSB0");
        assert_eq!(node.parity, Parity::None);

        let device = store.get_device(device_id).await.unwrap();
        assert_eq!(device.address, 17);
        assert!(device.last_poll_time.is_none());

        let tag = store.get_tag(tag_id).await.unwrap();
        assert_eq!(tag.register_kind, RegisterKind::HoldingRegister);
        assert_eq!(tag.server_data_type, DataType::I32);

        let tree = store.list_enabled_nodes_with_children().await.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].devices.len(), 1);
        assert_eq!(tree[0].devices[0].tags.len(), 1);
    }

    #[tokio::test]
    async fn missing_entities_are_not_found() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        assert!(matches!(
            store.get_node(99).await,
            Err(StoreError::NotFound { entity: "node", .. })
        ));
        assert!(matches!(
            store.get_tag(99).await,
            Err(StoreError::NotFound { entity: "tag", .. })
        ));
    }

    #[tokio::test]
    async fn status_and_poll_time_updates() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let node_id = store.insert_node(&sample_node()).await.unwrap();
        let device_id = store.insert_device(&sample_device(node_id)).await.unwrap();

        store
            .set_node_connection_status(node_id, ConnectionStatus::ErrorOpen, Some("Access denied"))
            .await
            .unwrap();
        let node = store.get_node(node_id).await.unwrap();
        assert_eq!(node.connection_status, ConnectionStatus::ErrorOpen);
        assert_eq!(node.last_error.as_deref(), Some("Access denied"));

        let now = Utc::now();
        store
            .set_device_last_poll_time(device_id, now)
            .await
            .unwrap();
        let device = store.get_device(device_id).await.unwrap();
        let stored = device.last_poll_time.unwrap();
        assert!((stored - now).num_milliseconds().abs() < 10);
    }

    #[tokio::test]
    async fn enabled_tag_filter() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let node_id = store.insert_node(&sample_node()).await.unwrap();
        let device_id = store.insert_device(&sample_device(node_id)).await.unwrap();
        store.insert_tag(&sample_tag(device_id)).await.unwrap();
        let mut disabled = sample_tag(device_id);
        disabled.enabled = false;
        store.insert_tag(&disabled).await.unwrap();

        assert_eq!(
            store.list_device_tags(device_id, false).await.unwrap().len(),
            2
        );
        assert_eq!(
            store.list_device_tags(device_id, true).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn history_and_settings() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let value = ScalarValue::Integer(42);
        store
            .append_history(1, 2, &value.to_string(), Utc::now())
            .await
            .unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) FROM history_data WHERE tag_id = 2")
            .fetch_one(store.pool())
            .await
            .unwrap()
            .get(0);
        assert_eq!(count, 1);

        assert!(store.get_setting("archiveInterval").await.unwrap().is_none());
        store.set_setting("archiveInterval", "5000").await.unwrap();
        assert_eq!(
            store.get_setting("archiveInterval").await.unwrap().as_deref(),
            Some("5000")
        );
        store.set_setting("archiveInterval", "9000").await.unwrap();
        assert_eq!(
            store.get_setting("archiveInterval").await.unwrap().as_deref(),
            Some("9000")
        );
    }

    #[tokio::test]
    async fn node_delete_cascades() {
        let store = SqliteStore::connect_in_memory().await.unwrap();
        let node_id = store.insert_node(&sample_node()).await.unwrap();
        let device_id = store.insert_device(&sample_device(node_id)).await.unwrap();
        store.insert_tag(&sample_tag(device_id)).await.unwrap();

        sqlx::query("DELETE FROM connection_nodes WHERE id = ?")
            .bind(node_id)
            .execute(store.pool())
            .await
            .unwrap();

        assert!(store.get_device(device_id).await.is_err());
        assert!(store
            .list_device_tags(device_id, false)
            .await
            .unwrap()
            .is_empty());
    }
}
