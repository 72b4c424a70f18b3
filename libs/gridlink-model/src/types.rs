//! Core value types: register kinds, data types, access modes, serial
//! parity, connection states, and the typed scalar carried by samples.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Modbus register kind a tag maps onto. The kind determines the function
/// code used for reads and whether the tag is writable at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterKind {
    #[serde(alias = "holding", alias = "holdingRegister")]
    HoldingRegister,
    #[serde(alias = "input", alias = "inputRegister")]
    InputRegister,
    #[serde(alias = "coil")]
    Coil,
    #[serde(alias = "discrete", alias = "discreteInput")]
    DiscreteInput,
}

impl RegisterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterKind::HoldingRegister => "HoldingRegister",
            RegisterKind::InputRegister => "InputRegister",
            RegisterKind::Coil => "Coil",
            RegisterKind::DiscreteInput => "DiscreteInput",
        }
    }

    /// Single-bit kinds are read with FC01/FC02 and carry 0/1 values.
    pub fn is_bit(&self) -> bool {
        matches!(self, RegisterKind::Coil | RegisterKind::DiscreteInput)
    }

    /// Only holding registers and coils accept writes on the bus.
    pub fn is_writable(&self) -> bool {
        matches!(self, RegisterKind::HoldingRegister | RegisterKind::Coil)
    }
}

impl FromStr for RegisterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HoldingRegister" | "holding" => Ok(RegisterKind::HoldingRegister),
            "InputRegister" | "input" => Ok(RegisterKind::InputRegister),
            "Coil" | "coil" => Ok(RegisterKind::Coil),
            "DiscreteInput" | "discrete" => Ok(RegisterKind::DiscreteInput),
            other => Err(format!("unknown register kind: {other}")),
        }
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric interpretation of register words, on either side of the codec
/// (device side and server side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "i16", alias = "int16")]
    I16,
    #[serde(rename = "u16", alias = "uint16")]
    U16,
    #[serde(rename = "i32", alias = "int32")]
    I32,
    #[serde(rename = "u32", alias = "uint32")]
    U32,
    #[serde(rename = "f32", alias = "float32", alias = "float")]
    F32,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::I16 => "i16",
            DataType::U16 => "u16",
            DataType::I32 => "i32",
            DataType::U32 => "u32",
            DataType::F32 => "f32",
        }
    }

    /// Number of consecutive 16-bit registers this type occupies.
    pub fn register_count(&self) -> u16 {
        match self {
            DataType::I16 | DataType::U16 => 1,
            DataType::I32 | DataType::U32 | DataType::F32 => 2,
        }
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i16" | "int16" => Ok(DataType::I16),
            "u16" | "uint16" => Ok(DataType::U16),
            "i32" | "int32" => Ok(DataType::I32),
            "u32" | "uint32" => Ok(DataType::U32),
            "f32" | "float32" | "float" => Ok(DataType::F32),
            other => Err(format!("unknown data type: {other}")),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag access mode as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadOnly => "ReadOnly",
            AccessMode::ReadWrite => "ReadWrite",
        }
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ReadOnly" | "read" => Ok(AccessMode::ReadOnly),
            "ReadWrite" | "readwrite" | "write" => Ok(AccessMode::ReadWrite),
            other => Err(format!("unknown access mode: {other}")),
        }
    }
}

/// Serial parity setting of a connection node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Parity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Parity::None => "none",
            Parity::Even => "even",
            Parity::Odd => "odd",
        }
    }
}

impl FromStr for Parity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "None" => Ok(Parity::None),
            "even" | "Even" => Ok(Parity::Even),
            "odd" | "Odd" => Ok(Parity::Odd),
            other => Err(format!("unknown parity: {other}")),
        }
    }
}

/// Observable connection state of a node's bus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    ErrorOpen,
    ErrorBus,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::ErrorOpen => "ErrorOpen",
            ConnectionStatus::ErrorBus => "ErrorBus",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Disconnected" => Ok(ConnectionStatus::Disconnected),
            "Connecting" => Ok(ConnectionStatus::Connecting),
            "Connected" => Ok(ConnectionStatus::Connected),
            "ErrorOpen" => Ok(ConnectionStatus::ErrorOpen),
            "ErrorBus" => Ok(ConnectionStatus::ErrorBus),
            other => Err(format!("unknown connection status: {other}")),
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed sample value. Integer kinds (including bits) are carried as
/// `Integer`; `f32` tags are carried as `Float`. Serializes as a bare JSON
/// number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Integer(i64),
    Float(f64),
}

impl ScalarValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ScalarValue::Integer(v) => *v as f64,
            ScalarValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Integer(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
        }
    }
}
