//! Configuration entities and the runtime sample type.
//!
//! Entities are created and mutated by the external CRUD surface; the
//! engine only reads them (through the store adapter) and writes back
//! connection status and poll timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AccessMode, ConnectionStatus, DataType, Parity, RegisterKind, ScalarValue};

/// One serial port / RS-485 bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionNode {
    pub id: i64,
    pub name: String,
    pub com_port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
    pub enabled: bool,
    pub connection_status: ConnectionStatus,
    pub last_error: Option<String>,
}

impl ConnectionNode {
    /// Check the serial settings against the documented domains.
    pub fn validate(&self) -> Result<(), String> {
        if self.baud_rate == 0 {
            return Err("baud rate must be greater than zero".to_string());
        }
        if ![7, 8].contains(&self.data_bits) {
            return Err(format!("data bits must be 7 or 8, got {}", self.data_bits));
        }
        if ![1, 2].contains(&self.stop_bits) {
            return Err(format!("stop bits must be 1 or 2, got {}", self.stop_bits));
        }
        Ok(())
    }
}

/// One Modbus slave on a node's bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub node_id: i64,
    pub name: String,
    /// Slave address. 0 is the broadcast address and is rejected for reads.
    pub address: u8,
    pub response_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub enabled: bool,
    pub last_poll_time: Option<DateTime<Utc>>,
}

impl Device {
    pub fn validate(&self) -> Result<(), String> {
        if self.address == 0 || self.address > 247 {
            return Err(format!(
                "slave address must be in 1..=247, got {}",
                self.address
            ));
        }
        if self.response_timeout_ms < 100 {
            return Err("response timeout must be at least 100 ms".to_string());
        }
        if self.poll_interval_ms < 100 {
            return Err("poll interval must be at least 100 ms".to_string());
        }
        Ok(())
    }
}

/// A typed view over one register (or a register pair) of a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub device_id: i64,
    pub name: String,
    pub address: u16,
    pub register_kind: RegisterKind,
    pub device_data_type: DataType,
    pub server_data_type: DataType,
    pub access: AccessMode,
    pub enabled: bool,
}

impl Tag {
    /// A tag accepts writes only when its access mode and register kind
    /// both permit it.
    pub fn is_writable(&self) -> bool {
        self.access == AccessMode::ReadWrite && self.register_kind.is_writable()
    }
}

/// Latest reading of one tag. `value` is `None` exactly when the most
/// recent attempt failed, in which case `error` carries the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub tag_id: i64,
    pub device_id: i64,
    pub value: Option<ScalarValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    pub fn ok(tag_id: i64, device_id: i64, value: ScalarValue) -> Self {
        Self {
            tag_id,
            device_id,
            value: Some(value),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(tag_id: i64, device_id: i64, error: impl Into<String>) -> Self {
        Self {
            tag_id,
            device_id,
            value: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.value.is_some()
    }
}

/// One archived reading, value rendered to text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub device_id: i64,
    pub tag_id: i64,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

/// A device together with its tags, as loaded from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceWithTags {
    #[serde(flatten)]
    pub device: Device,
    pub tags: Vec<Tag>,
}

impl DeviceWithTags {
    pub fn enabled_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter().filter(|t| t.enabled)
    }
}

/// A node together with its devices and their tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeWithChildren {
    #[serde(flatten)]
    pub node: ConnectionNode,
    pub devices: Vec<DeviceWithTags>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> ConnectionNode {
        ConnectionNode {
            id: 1,
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

    #[test]
    fn node_validation() {
        assert!(node().validate().is_ok());

        let mut bad = node();
        bad.data_bits = 9;
        assert!(bad.validate().is_err());

        let mut bad = node();
        bad.stop_bits = 3;
        assert!(bad.validate().is_err());

        let mut bad = node();
        bad.baud_rate = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn device_validation() {
        let mut device = Device {
            id: 1,
            node_id: 1,
            name: "meter".to_string(),
            address: 17,
            response_timeout_ms: 1000,
            poll_interval_ms: 1000,
            enabled: true,
            last_poll_time: None,
        };
        assert!(device.validate().is_ok());

        device.address = 0; // broadcast, not pollable
        assert!(device.validate().is_err());
        device.address = 248;
        assert!(device.validate().is_err());

        device.address = 1;
        device.response_timeout_ms = 50;
        assert!(device.validate().is_err());
    }

    #[test]
    fn sample_value_error_exclusivity() {
        let ok = Sample::ok(1, 2, ScalarValue::Integer(42));
        assert!(ok.is_ok());
        assert!(ok.error.is_none());

        let bad = Sample::failed(1, 2, "device response timeout");
        assert!(!bad.is_ok());
        assert!(bad.value.is_none());
        assert_eq!(bad.error.as_deref(), Some("device response timeout"));
    }

    #[test]
    fn tag_writability() {
        let mut tag = Tag {
            id: 1,
            device_id: 1,
            name: "setpoint".to_string(),
            address: 10,
            register_kind: RegisterKind::HoldingRegister,
            device_data_type: DataType::I16,
            server_data_type: DataType::I32,
            access: AccessMode::ReadWrite,
            enabled: true,
        };
        assert!(tag.is_writable());

        tag.register_kind = RegisterKind::InputRegister;
        assert!(!tag.is_writable());

        tag.register_kind = RegisterKind::Coil;
        tag.access = AccessMode::ReadOnly;
        assert!(!tag.is_writable());
    }
}
