//! Modbus RTU protocol stack: PDU construction, RTU framing with CRC-16,
//! the request/response client, and the register codec.

pub mod client;
pub mod codec;
pub mod frame;
pub mod pdu;
pub mod simulator;

pub use client::ModbusMaster;
pub use frame::{crc16, RtuFrame};
pub use pdu::ModbusPdu;

/// Function codes used by this master.
pub mod function {
    pub const READ_COILS: u8 = 0x01;
    pub const READ_DISCRETE_INPUTS: u8 = 0x02;
    pub const READ_HOLDING_REGISTERS: u8 = 0x03;
    pub const READ_INPUT_REGISTERS: u8 = 0x04;
    pub const WRITE_SINGLE_COIL: u8 = 0x05;
    pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
    pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
}

/// Largest PDU allowed by the specification.
pub const MAX_PDU_SIZE: usize = 253;

/// Largest RTU frame: address + PDU + CRC.
pub const MAX_FRAME_SIZE: usize = MAX_PDU_SIZE + 3;

/// Most registers a single read request may ask for.
pub const MAX_READ_REGISTERS: u16 = 125;

/// Most bits a single read request may ask for.
pub const MAX_READ_BITS: u16 = 2000;

/// Most registers a single FC16 write may carry.
pub const MAX_WRITE_REGISTERS: u16 = 123;
