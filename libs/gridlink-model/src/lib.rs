//! Domain model for the GridLink acquisition server.
//!
//! A closed algebraic description of the configuration entities (connection
//! nodes, devices, tags), the runtime sample type, and the event wire
//! schema. This crate is I/O-free; the store and the engine both build on
//! it.

pub mod entities;
pub mod events;
pub mod types;

pub use entities::{
    ConnectionNode, Device, DeviceWithTags, HistoryRecord, NodeWithChildren, Sample, Tag,
};
pub use events::{
    state_event, DeviceState, Event, ManagerStatus, MessageData, MessageLevel, MessageText,
    NodeState, StateData, TagState, TagValue,
};
pub use types::{
    AccessMode, ConnectionStatus, DataType, Parity, RegisterKind, ScalarValue,
};
