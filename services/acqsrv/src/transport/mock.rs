//! Mock transport for protocol and engine tests.
//!
//! Sent frames are recorded; replies come either from a scripted queue or
//! from a responder function (typically a slave simulator). A responder
//! returning `None` produces silence, which the client observes as a
//! response timeout.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Transport, TransportError, TransportStats};

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct MockState {
    connected: bool,
    fail_connect: Option<String>,
    sent: Vec<Vec<u8>>,
    pending: VecDeque<u8>,
    scripted: VecDeque<Vec<u8>>,
    responder: Option<Responder>,
    max_chunk: Option<usize>,
    stats: TransportStats,
}

/// Cloneable view into a mock transport's state, held by tests after the
/// transport itself moves into a session.
#[derive(Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// Queue one reply frame for the next request.
    pub fn push_reply(&self, frame: Vec<u8>) {
        self.state.lock().scripted.push_back(frame);
    }

    /// Make the next `connect()` fail with the given reason.
    pub fn fail_connect(&self, reason: impl Into<String>) {
        self.state.lock().fail_connect = Some(reason.into());
    }

    pub fn set_responder(&self, f: impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static) {
        self.state.lock().responder = Some(Box::new(f));
    }

    /// Deliver at most `n` bytes per receive call, like a slow UART.
    pub fn set_max_chunk(&self, n: usize) {
        self.state.lock().max_chunk = Some(n);
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }
}

pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn with_responder(f: impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static) -> Self {
        let transport = Self::new();
        transport.handle().set_responder(f);
        transport
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn transport_type(&self) -> &'static str {
        "mock"
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.stats.connection_attempts += 1;
        if let Some(reason) = state.fail_connect.clone() {
            state.stats.failed_connections += 1;
            return Err(TransportError::ConnectionFailed(reason));
        }
        state.connected = true;
        state.stats.successful_connections += 1;
        Ok(())
    }

    async fn disconnect(&mut self) {
        let mut state = self.state.lock();
        if state.connected {
            state.connected = false;
            state.stats.disconnections += 1;
        }
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(TransportError::NotConnected("mock is not open".to_string()));
        }
        state.stats.bytes_sent += data.len() as u64;
        state.sent.push(data.to_vec());

        let reply = if let Some(responder) = state.responder.as_mut() {
            responder(data)
        } else {
            state.scripted.pop_front()
        };
        if let Some(reply) = reply {
            state.pending.extend(reply);
        }
        Ok(())
    }

    async fn receive(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, TransportError> {
        {
            let state = self.state.lock();
            if !state.connected {
                return Err(TransportError::NotConnected("mock is not open".to_string()));
            }
        }

        let mut drained = self.drain(buffer);
        if drained == 0 {
            // nothing buffered: behave like a quiet wire for the full window
            tokio::time::sleep(timeout).await;
            drained = self.drain(buffer);
            if drained == 0 {
                return Err(TransportError::Timeout(format!(
                    "no data within {timeout:?}"
                )));
            }
        }
        Ok(drained)
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn stats(&self) -> TransportStats {
        self.state.lock().stats
    }
}

impl MockTransport {
    fn drain(&self, buffer: &mut [u8]) -> usize {
        let mut state = self.state.lock();
        let mut n = buffer.len().min(state.pending.len());
        if let Some(max) = state.max_chunk {
            n = n.min(max);
        }
        for slot in buffer.iter_mut().take(n) {
            *slot = state.pending.pop_front().unwrap_or_default();
        }
        state.stats.bytes_received += n as u64;
        n
    }
}
