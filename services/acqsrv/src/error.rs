//! Engine error taxonomy.
//!
//! One enum covers the whole pipeline: command validation, bus I/O, codec
//! rejections, port lifecycle, and persistence. Poll errors are confined to
//! tagged null samples; write errors surface to the caller with an
//! operator-readable message.

use thiserror::Error;

use crate::transport::TransportError;
use gridlink_store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcqError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("not writable: {0}")]
    NotWritable(String),

    #[error("not connected: {0}")]
    NotConnected(String),

    #[error("device response timeout")]
    TransactionTimedOut,

    #[error("frame error: {0}")]
    FrameError(String),

    #[error("modbus exception {0}")]
    ModbusException(u8),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("failed to open port: {0}")]
    PortOpenFailed(String),

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl AcqError {
    /// Remote exception code, when the error is a Modbus exception.
    pub fn exception_code(&self) -> Option<u8> {
        match self {
            AcqError::ModbusException(code) => Some(*code),
            _ => None,
        }
    }

    /// Human-readable message for operators, used in API responses and
    /// broadcast notifications.
    pub fn operator_message(&self) -> String {
        match self {
            AcqError::ModbusException(1) => {
                "device does not support writing this address".to_string()
            },
            AcqError::ModbusException(2) => {
                "register address is not available on this device".to_string()
            },
            AcqError::ModbusException(3) => "device rejected the written value".to_string(),
            AcqError::ModbusException(4) => "device reported an internal failure".to_string(),
            AcqError::ModbusException(code) => format!("device returned exception code {code}"),
            AcqError::TransactionTimedOut => {
                "device did not respond, try reconnecting".to_string()
            },
            other => other.to_string(),
        }
    }
}

impl From<TransportError> for AcqError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(_) => AcqError::TransactionTimedOut,
            TransportError::ConnectionFailed(msg) => AcqError::PortOpenFailed(msg),
            TransportError::ConfigError(msg) => AcqError::ConfigError(msg),
            TransportError::NotConnected(msg) => AcqError::NotConnected(msg),
            TransportError::SendFailed(msg) | TransportError::ReceiveFailed(msg) => {
                AcqError::TransportError(msg)
            },
        }
    }
}

impl From<StoreError> for AcqError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => AcqError::NotFound { entity, id },
            other => AcqError::PersistenceError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AcqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_mentions_timeout() {
        let err = AcqError::TransactionTimedOut;
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn operator_messages() {
        assert_eq!(
            AcqError::ModbusException(1).operator_message(),
            "device does not support writing this address"
        );
        assert_eq!(
            AcqError::TransactionTimedOut.operator_message(),
            "device did not respond, try reconnecting"
        );
    }

    #[test]
    fn transport_conversions() {
        let err: AcqError = TransportError::Timeout("no response".to_string()).into();
        assert_eq!(err, AcqError::TransactionTimedOut);

        let err: AcqError = TransportError::ConnectionFailed("Access denied".to_string()).into();
        assert!(matches!(err, AcqError::PortOpenFailed(_)));
    }

    #[test]
    fn exception_code_extraction() {
        assert_eq!(AcqError::ModbusException(2).exception_code(), Some(2));
        assert_eq!(AcqError::TransactionTimedOut.exception_code(), None);
    }
}
