//! Serial port transport over tokio-serial.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use super::{SerialSettings, Transport, TransportError, TransportStats};

pub struct SerialTransport {
    settings: SerialSettings,
    stream: Option<SerialStream>,
    stats: TransportStats,
}

impl SerialTransport {
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            stream: None,
            stats: TransportStats::default(),
        }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn transport_type(&self) -> &'static str {
        "serial"
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        self.stats.connection_attempts += 1;
        debug!("opening serial port {}", self.settings.path);

        let builder = tokio_serial::new(&self.settings.path, self.settings.baud_rate)
            .data_bits(self.settings.data_bits())
            .stop_bits(self.settings.stop_bits())
            .parity(self.settings.parity());

        match builder.open_native_async() {
            Ok(mut stream) => {
                #[cfg(unix)]
                if let Err(e) = stream.set_exclusive(false) {
                    warn!("set_exclusive({}): {e}", self.settings.path);
                }
                self.stream = Some(stream);
                self.stats.successful_connections += 1;
                info!("serial port open: {}", self.settings.path);
                Ok(())
            },
            Err(e) => {
                self.stats.failed_connections += 1;
                Err(TransportError::ConnectionFailed(format!(
                    "{}: {e}",
                    self.settings.path
                )))
            },
        }
    }

    async fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            // dropping the stream closes the port
            self.stats.disconnections += 1;
            info!("serial port closed: {}", self.settings.path);
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            TransportError::NotConnected(format!("{} is not open", self.settings.path))
        })?;

        match async {
            stream.write_all(data).await?;
            stream.flush().await
        }
        .await
        {
            Ok(()) => {
                self.stats.bytes_sent += data.len() as u64;
                debug!(
                    direction = "tx",
                    port = %self.settings.path,
                    frame = %hex_dump(data),
                    "serial frame"
                );
                Ok(())
            },
            Err(e) => {
                // a failed write usually means the adapter went away
                self.stream = None;
                Err(TransportError::SendFailed(format!(
                    "{}: {e}",
                    self.settings.path
                )))
            },
        }
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout_duration: Duration,
    ) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            TransportError::NotConnected(format!("{} is not open", self.settings.path))
        })?;

        match timeout(timeout_duration, stream.read(buffer)).await {
            Ok(Ok(0)) => Err(TransportError::ReceiveFailed(format!(
                "{}: port returned EOF",
                self.settings.path
            ))),
            Ok(Ok(n)) => {
                self.stats.bytes_received += n as u64;
                debug!(
                    direction = "rx",
                    port = %self.settings.path,
                    frame = %hex_dump(&buffer[..n]),
                    "serial frame"
                );
                Ok(n)
            },
            Ok(Err(e)) => {
                self.stream = None;
                Err(TransportError::ReceiveFailed(format!(
                    "{}: {e}",
                    self.settings.path
                )))
            },
            Err(_) => Err(TransportError::Timeout(format!(
                "no data within {timeout_duration:?}"
            ))),
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_model::Parity;

    fn settings() -> SerialSettings {
        SerialSettings {
            path: "/dev/null-serial".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }

    #[tokio::test]
    async fn not_connected_initially() {
        let transport = SerialTransport::new(settings());
        assert!(!transport.is_connected());
        assert_eq!(transport.stats().connection_attempts, 0);
    }

    #[tokio::test]
    async fn send_without_connect_fails() {
        let mut transport = SerialTransport::new(settings());
        let err = transport.send(&[0x01]).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(_)));
    }

    #[tokio::test]
    async fn connect_to_missing_port_fails() {
        let mut transport = SerialTransport::new(settings());
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
        assert_eq!(transport.stats().failed_connections, 1);
    }

    #[test]
    fn hex_dump_format() {
        assert_eq!(hex_dump(&[0x01, 0xAB, 0x00]), "01 AB 00");
    }
}
