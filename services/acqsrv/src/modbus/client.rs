//! Modbus RTU master over a [`Transport`].
//!
//! One request at a time: build PDU, frame it, transmit, then accumulate
//! response bytes until the implied frame length is reached or the
//! deadline passes. CRC, unit echo, and function echo are all validated;
//! exception responses surface as [`AcqError::ModbusException`].

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::error::{AcqError, Result};
use crate::transport::{Transport, TransportError};

use super::frame::{expected_frame_len, RtuFrame};
use super::pdu::{ModbusPdu, PduBuilder};
use super::{function, MAX_FRAME_SIZE, MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};

pub struct ModbusMaster {
    transport: Box<dyn Transport>,
    timeout: Duration,
}

impl ModbusMaster {
    pub fn new(transport: Box<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await.map_err(AcqError::from)
    }

    pub async fn close(&mut self) {
        self.transport.disconnect().await;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub async fn read_coils(&mut self, unit: u8, addr: u16, count: u16) -> Result<Vec<bool>> {
        self.read_bits(function::READ_COILS, unit, addr, count)
            .await
    }

    pub async fn read_discrete_inputs(
        &mut self,
        unit: u8,
        addr: u16,
        count: u16,
    ) -> Result<Vec<bool>> {
        self.read_bits(function::READ_DISCRETE_INPUTS, unit, addr, count)
            .await
    }

    pub async fn read_holding_registers(
        &mut self,
        unit: u8,
        addr: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        self.read_words(function::READ_HOLDING_REGISTERS, unit, addr, count)
            .await
    }

    pub async fn read_input_registers(
        &mut self,
        unit: u8,
        addr: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        self.read_words(function::READ_INPUT_REGISTERS, unit, addr, count)
            .await
    }

    pub async fn write_single_coil(&mut self, unit: u8, addr: u16, on: bool) -> Result<()> {
        // FC05 encodes ON as 0xFF00
        let request = PduBuilder::new(function::WRITE_SINGLE_COIL)
            .u16(addr)?
            .u16(if on { 0xFF00 } else { 0x0000 })?
            .build();
        let response = self.transact(unit, request).await?;
        Self::check_write_echo(&response, function::WRITE_SINGLE_COIL)
    }

    pub async fn write_single_register(&mut self, unit: u8, addr: u16, word: u16) -> Result<()> {
        let request = PduBuilder::new(function::WRITE_SINGLE_REGISTER)
            .u16(addr)?
            .u16(word)?
            .build();
        let response = self.transact(unit, request).await?;
        Self::check_write_echo(&response, function::WRITE_SINGLE_REGISTER)
    }

    pub async fn write_multiple_registers(
        &mut self,
        unit: u8,
        addr: u16,
        words: &[u16],
    ) -> Result<()> {
        if words.is_empty() || words.len() > MAX_WRITE_REGISTERS as usize {
            return Err(AcqError::InvalidValue(format!(
                "register count {} out of range for FC16",
                words.len()
            )));
        }
        let mut builder = PduBuilder::new(function::WRITE_MULTIPLE_REGISTERS)
            .u16(addr)?
            .u16(words.len() as u16)?
            .byte((words.len() * 2) as u8)?;
        for &word in words {
            builder = builder.u16(word)?;
        }
        let response = self.transact(unit, builder.build()).await?;
        Self::check_write_echo(&response, function::WRITE_MULTIPLE_REGISTERS)
    }

    async fn read_bits(&mut self, fc: u8, unit: u8, addr: u16, count: u16) -> Result<Vec<bool>> {
        if count == 0 || count > MAX_READ_BITS {
            return Err(AcqError::InvalidValue(format!(
                "bit count {count} out of range"
            )));
        }
        let request = PduBuilder::new(fc).u16(addr)?.u16(count)?.build();
        let response = self.transact(unit, request).await?;

        let payload = Self::check_read_payload(&response, fc)?;
        let expected_bytes = count.div_ceil(8) as usize;
        if payload.len() != expected_bytes {
            return Err(AcqError::FrameError(format!(
                "bit response carries {} bytes, expected {expected_bytes}",
                payload.len()
            )));
        }

        let bits = (0..count as usize)
            .map(|i| payload[i / 8] & (1 << (i % 8)) != 0)
            .collect();
        Ok(bits)
    }

    async fn read_words(&mut self, fc: u8, unit: u8, addr: u16, count: u16) -> Result<Vec<u16>> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(AcqError::InvalidValue(format!(
                "register count {count} out of range"
            )));
        }
        let request = PduBuilder::new(fc).u16(addr)?.u16(count)?.build();
        let response = self.transact(unit, request).await?;

        let payload = Self::check_read_payload(&response, fc)?;
        if payload.len() != count as usize * 2 {
            return Err(AcqError::FrameError(format!(
                "register response carries {} bytes, expected {}",
                payload.len(),
                count * 2
            )));
        }

        let words = payload
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(words)
    }

    /// Send one request and collect the matching response frame.
    async fn transact(&mut self, unit: u8, request: ModbusPdu) -> Result<ModbusPdu> {
        let request_fc = request.function_code().unwrap_or_default();
        let frame = RtuFrame::new(unit, request).to_bytes();
        trace!(unit, fc = request_fc, "modbus request");
        self.transport.send(&frame).await.map_err(AcqError::from)?;

        let bytes = self.collect_response().await?;
        let response = RtuFrame::from_bytes(&bytes)?;

        if response.unit != unit {
            return Err(AcqError::FrameError(format!(
                "response from unit {}, expected {unit}",
                response.unit
            )));
        }
        if let Some(code) = response.pdu.exception_code() {
            return Err(AcqError::ModbusException(code));
        }
        if response.pdu.function_code() != Some(request_fc) {
            return Err(AcqError::FrameError(format!(
                "function echo mismatch: sent {request_fc:#04X}, got {:#04X}",
                response.pdu.function_code().unwrap_or_default()
            )));
        }
        Ok(response.pdu)
    }

    /// Accumulate bytes until the implied frame length is reached. The
    /// whole wait is bounded by one response timeout.
    async fn collect_response(&mut self) -> Result<Vec<u8>> {
        let deadline = Instant::now() + self.timeout;
        let mut buffer = Vec::with_capacity(MAX_FRAME_SIZE);
        let mut chunk = [0u8; MAX_FRAME_SIZE];

        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .filter(|d| !d.is_zero())
                .ok_or(AcqError::TransactionTimedOut)?;

            match self.transport.receive(&mut chunk, remaining).await {
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(TransportError::Timeout(_)) => return Err(AcqError::TransactionTimedOut),
                Err(e) => return Err(e.into()),
            }

            if let Some(need) = expected_frame_len(&buffer) {
                if buffer.len() >= need {
                    buffer.truncate(need);
                    return Ok(buffer);
                }
            }
        }
    }

    fn check_read_payload(response: &ModbusPdu, fc: u8) -> Result<&[u8]> {
        let payload = response.payload();
        if payload.is_empty() {
            return Err(AcqError::FrameError(format!(
                "empty response payload for FC{fc:02X}"
            )));
        }
        let byte_count = payload[0] as usize;
        let data = &payload[1..];
        if data.len() != byte_count {
            return Err(AcqError::FrameError(format!(
                "byte count {byte_count} does not match payload of {}",
                data.len()
            )));
        }
        Ok(data)
    }

    fn check_write_echo(response: &ModbusPdu, fc: u8) -> Result<()> {
        // transact() already validated the function echo; a well-formed
        // write echo carries address + value/quantity
        if response.payload().len() < 4 {
            return Err(AcqError::FrameError(format!(
                "short write echo for FC{fc:02X}"
            )));
        }
        Ok(())
    }
}
