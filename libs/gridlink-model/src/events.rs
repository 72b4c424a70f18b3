//! Event wire schema for the real-time stream.
//!
//! Three event kinds reach observers: a full system snapshot, a per-device
//! batch of tag values, and a user-facing notification. The JSON framing
//! follows the UI contract: `{"type": "state" | "tagValues" | "message", ...}`
//! with camelCase fields and ISO-8601 UTC timestamps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{NodeWithChildren, Sample};
use crate::types::{AccessMode, ConnectionStatus, DataType, RegisterKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Event {
    State {
        data: StateData,
    },
    #[serde(rename_all = "camelCase")]
    TagValues {
        device_id: i64,
        data: HashMap<i64, TagValue>,
        timestamp: DateTime<Utc>,
    },
    Message {
        data: MessageData,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Build a `tagValues` event from freshly recorded samples.
    pub fn tag_values<'a>(
        device_id: i64,
        samples: impl IntoIterator<Item = (&'a str, &'a Sample)>,
    ) -> Self {
        let data = samples
            .into_iter()
            .map(|(name, sample)| {
                (
                    sample.tag_id,
                    TagValue {
                        tag_id: sample.tag_id,
                        tag_name: name.to_string(),
                        value: sample.value,
                        error: sample.error.clone(),
                        timestamp: sample.timestamp,
                    },
                )
            })
            .collect();
        Event::TagValues {
            device_id,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn message(
        level: MessageLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Event::Message {
            data: MessageData {
                text: MessageText {
                    title: title.into(),
                    description: description.into(),
                },
                message_type: level,
            },
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateData {
    pub modbus_manager_status: ManagerStatus,
    pub nodes: Vec<NodeState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerStatus {
    pub is_running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub id: i64,
    pub name: String,
    pub com_port: String,
    pub enabled: bool,
    pub connection_status: ConnectionStatus,
    pub last_error: Option<String>,
    pub devices: Vec<DeviceState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub id: i64,
    pub name: String,
    pub address: u8,
    pub enabled: bool,
    pub last_poll_time: Option<DateTime<Utc>>,
    pub tags: Vec<TagState>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagState {
    pub id: i64,
    pub name: String,
    pub address: u16,
    pub register_type: RegisterKind,
    pub access_type: AccessMode,
    pub enabled: bool,
    pub device_data_type: DataType,
    pub server_data_type: DataType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagValue {
    pub tag_id: i64,
    pub tag_name: String,
    pub value: Option<crate::types::ScalarValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    pub text: MessageText,
    pub message_type: MessageLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageText {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Build the node tree of a `state` event from store entities.
pub fn state_event(is_running: bool, nodes: &[NodeWithChildren]) -> Event {
    let nodes = nodes
        .iter()
        .map(|n| NodeState {
            id: n.node.id,
            name: n.node.name.clone(),
            com_port: n.node.com_port.clone(),
            enabled: n.node.enabled,
            connection_status: n.node.connection_status,
            last_error: n.node.last_error.clone(),
            devices: n
                .devices
                .iter()
                .map(|d| DeviceState {
                    id: d.device.id,
                    name: d.device.name.clone(),
                    address: d.device.address,
                    enabled: d.device.enabled,
                    last_poll_time: d.device.last_poll_time,
                    tags: d
                        .tags
                        .iter()
                        .map(|t| TagState {
                            id: t.id,
                            name: t.name.clone(),
                            address: t.address,
                            register_type: t.register_kind,
                            access_type: t.access,
                            enabled: t.enabled,
                            device_data_type: t.device_data_type,
                            server_data_type: t.server_data_type,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Event::State {
        data: StateData {
            modbus_manager_status: ManagerStatus {
                is_running,
            },
            nodes,
        },
    }
}
