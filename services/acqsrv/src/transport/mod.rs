//! Byte-level transport under the Modbus client.
//!
//! A bus session owns exactly one transport for its lifetime; every method
//! takes `&mut self` and no internal locking is needed. The serial
//! implementation talks to a real port; the mock implementation backs
//! protocol and engine tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use gridlink_model::{ConnectionNode, Parity};

pub mod mock;
pub mod serial;

pub use mock::{MockHandle, MockTransport};
pub use serial::SerialTransport;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("not connected: {0}")]
    NotConnected(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Running counters kept by every transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub connection_attempts: u64,
    pub successful_connections: u64,
    pub failed_connections: u64,
    pub disconnections: u64,
}

/// One byte pipe to a bus.
#[async_trait]
pub trait Transport: Send {
    fn transport_type(&self) -> &'static str;

    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn disconnect(&mut self);

    /// Write one frame, flushing it onto the wire.
    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read whatever bytes arrive within `timeout`. Returns at least one
    /// byte on success; `Timeout` if nothing arrived.
    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError>;

    fn is_connected(&self) -> bool;

    fn stats(&self) -> TransportStats;
}

/// Serial settings extracted from a connection node, validated against the
/// supported domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: Parity,
}

impl SerialSettings {
    pub fn from_node(node: &ConnectionNode) -> Result<Self, TransportError> {
        node.validate().map_err(TransportError::ConfigError)?;
        if node.com_port.is_empty() {
            return Err(TransportError::ConfigError(
                "serial port path is empty".to_string(),
            ));
        }
        Ok(Self {
            path: node.com_port.clone(),
            baud_rate: node.baud_rate,
            data_bits: node.data_bits,
            stop_bits: node.stop_bits,
            parity: node.parity,
        })
    }

    pub fn data_bits(&self) -> tokio_serial::DataBits {
        match self.data_bits {
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        }
    }

    pub fn stop_bits(&self) -> tokio_serial::StopBits {
        match self.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        }
    }

    pub fn parity(&self) -> tokio_serial::Parity {
        match self.parity {
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::None => tokio_serial::Parity::None,
        }
    }
}

/// Creates the transport for a node. The engine holds one factory; tests
/// substitute mocks, production uses [`SerialTransportFactory`].
pub trait TransportFactory: Send + Sync {
    fn create(&self, node: &ConnectionNode) -> Result<Box<dyn Transport>, TransportError>;
}

/// Adapter turning a closure into a [`TransportFactory`], for tests and
/// embedding.
pub struct FnTransportFactory<F>(pub F);

impl<F> TransportFactory for FnTransportFactory<F>
where
    F: Fn(&ConnectionNode) -> Result<Box<dyn Transport>, TransportError> + Send + Sync,
{
    fn create(&self, node: &ConnectionNode) -> Result<Box<dyn Transport>, TransportError> {
        (self.0)(node)
    }
}

/// Production factory: one serial transport per node.
#[derive(Debug, Default)]
pub struct SerialTransportFactory;

impl TransportFactory for SerialTransportFactory {
    fn create(&self, node: &ConnectionNode) -> Result<Box<dyn Transport>, TransportError> {
        let settings = SerialSettings::from_node(node)?;
        Ok(Box::new(SerialTransport::new(settings)))
    }
}
