//! In-process Modbus slave simulator.
//!
//! Answers RTU request frames from configurable register banks, one bank
//! per unit address. Plugged into a mock transport it stands in for a whole
//! RS-485 bus: offline units stay silent, unknown addresses produce
//! exception 2, and units can be configured to refuse FC16 so the client's
//! single-register fallback is exercisable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::frame::crc16;
use super::function;

#[derive(Debug, Default)]
struct UnitBank {
    holding: HashMap<u16, u16>,
    input: HashMap<u16, u16>,
    coils: HashMap<u16, bool>,
    discrete: HashMap<u16, bool>,
}

#[derive(Debug, Default)]
struct SimState {
    units: HashMap<u8, UnitBank>,
    offline: HashSet<u8>,
    reject_multiple_writes: HashSet<u8>,
}

/// Shared handle to the simulated bus; clones observe the same banks.
#[derive(Debug, Clone, Default)]
pub struct SlaveSimulator {
    state: Arc<Mutex<SimState>>,
}

impl SlaveSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_holding(&self, unit: u8, addr: u16, value: u16) {
        self.state
            .lock()
            .units
            .entry(unit)
            .or_default()
            .holding
            .insert(addr, value);
    }

    pub fn set_input(&self, unit: u8, addr: u16, value: u16) {
        self.state
            .lock()
            .units
            .entry(unit)
            .or_default()
            .input
            .insert(addr, value);
    }

    pub fn set_coil(&self, unit: u8, addr: u16, on: bool) {
        self.state
            .lock()
            .units
            .entry(unit)
            .or_default()
            .coils
            .insert(addr, on);
    }

    pub fn set_discrete(&self, unit: u8, addr: u16, on: bool) {
        self.state
            .lock()
            .units
            .entry(unit)
            .or_default()
            .discrete
            .insert(addr, on);
    }

    pub fn holding(&self, unit: u8, addr: u16) -> Option<u16> {
        self.state
            .lock()
            .units
            .get(&unit)
            .and_then(|bank| bank.holding.get(&addr).copied())
    }

    pub fn coil(&self, unit: u8, addr: u16) -> Option<bool> {
        self.state
            .lock()
            .units
            .get(&unit)
            .and_then(|bank| bank.coils.get(&addr).copied())
    }

    /// Offline units ignore every request, producing client timeouts.
    pub fn set_offline(&self, unit: u8, offline: bool) {
        let mut state = self.state.lock();
        if offline {
            state.offline.insert(unit);
        } else {
            state.offline.remove(&unit);
        }
    }

    /// Make a unit answer FC16 with exception 1 (illegal function).
    pub fn reject_write_multiple(&self, unit: u8) {
        self.state.lock().reject_multiple_writes.insert(unit);
    }

    /// Responder closure for a mock transport.
    pub fn responder(&self) -> impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static {
        let sim = self.clone();
        move |request| sim.process(request)
    }

    /// Handle one request frame; `None` means bus silence.
    pub fn process(&self, frame: &[u8]) -> Option<Vec<u8>> {
        if frame.len() < 4 {
            return None;
        }
        let crc_pos = frame.len() - 2;
        let received = u16::from_le_bytes([frame[crc_pos], frame[crc_pos + 1]]);
        if received != crc16(&frame[..crc_pos]) {
            // a real slave treats a bad frame as line noise
            return None;
        }

        let unit = frame[0];
        let pdu = &frame[1..crc_pos];
        let fc = *pdu.first()?;

        let mut state = self.state.lock();
        if state.offline.contains(&unit) || !state.units.contains_key(&unit) {
            return None;
        }

        let reply_pdu = match fc {
            function::READ_COILS | function::READ_DISCRETE_INPUTS => {
                Self::read_bits(&state, unit, fc, pdu)
            },
            function::READ_HOLDING_REGISTERS | function::READ_INPUT_REGISTERS => {
                Self::read_words(&state, unit, fc, pdu)
            },
            function::WRITE_SINGLE_COIL => Self::write_coil(&mut state, unit, pdu),
            function::WRITE_SINGLE_REGISTER => Self::write_register(&mut state, unit, pdu),
            function::WRITE_MULTIPLE_REGISTERS => Self::write_registers(&mut state, unit, pdu),
            _ => exception(fc, 1),
        };

        Some(frame_reply(unit, &reply_pdu))
    }

    fn read_bits(state: &SimState, unit: u8, fc: u8, pdu: &[u8]) -> Vec<u8> {
        let Some((addr, count)) = parse_addr_count(pdu) else {
            return exception(fc, 3);
        };
        let bank = &state.units[&unit];
        let table = if fc == function::READ_COILS {
            &bank.coils
        } else {
            &bank.discrete
        };

        let mut bits = Vec::with_capacity(count as usize);
        for offset in 0..count {
            match table.get(&(addr + offset)) {
                Some(&bit) => bits.push(bit),
                None => return exception(fc, 2),
            }
        }

        let mut reply = vec![fc, bits.len().div_ceil(8) as u8];
        let mut packed = vec![0u8; bits.len().div_ceil(8)];
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                packed[i / 8] |= 1 << (i % 8);
            }
        }
        reply.extend_from_slice(&packed);
        reply
    }

    fn read_words(state: &SimState, unit: u8, fc: u8, pdu: &[u8]) -> Vec<u8> {
        let Some((addr, count)) = parse_addr_count(pdu) else {
            return exception(fc, 3);
        };
        let bank = &state.units[&unit];
        let table = if fc == function::READ_HOLDING_REGISTERS {
            &bank.holding
        } else {
            &bank.input
        };

        let mut reply = vec![fc, (count * 2) as u8];
        for offset in 0..count {
            match table.get(&(addr + offset)) {
                Some(&word) => reply.extend_from_slice(&word.to_be_bytes()),
                None => return exception(fc, 2),
            }
        }
        reply
    }

    fn write_coil(state: &mut SimState, unit: u8, pdu: &[u8]) -> Vec<u8> {
        let Some((addr, raw)) = parse_addr_count(pdu) else {
            return exception(function::WRITE_SINGLE_COIL, 3);
        };
        let on = match raw {
            0xFF00 => true,
            0x0000 => false,
            _ => return exception(function::WRITE_SINGLE_COIL, 3),
        };
        let Some(bank) = state.units.get_mut(&unit) else {
            return exception(function::WRITE_SINGLE_COIL, 4);
        };
        bank.coils.insert(addr, on);
        pdu.to_vec()
    }

    fn write_register(state: &mut SimState, unit: u8, pdu: &[u8]) -> Vec<u8> {
        let Some((addr, value)) = parse_addr_count(pdu) else {
            return exception(function::WRITE_SINGLE_REGISTER, 3);
        };
        let Some(bank) = state.units.get_mut(&unit) else {
            return exception(function::WRITE_SINGLE_REGISTER, 4);
        };
        bank.holding.insert(addr, value);
        pdu.to_vec()
    }

    fn write_registers(state: &mut SimState, unit: u8, pdu: &[u8]) -> Vec<u8> {
        if state.reject_multiple_writes.contains(&unit) {
            return exception(function::WRITE_MULTIPLE_REGISTERS, 1);
        }
        let Some((addr, count)) = parse_addr_count(pdu) else {
            return exception(function::WRITE_MULTIPLE_REGISTERS, 3);
        };
        if pdu.len() < 6 + count as usize * 2 {
            return exception(function::WRITE_MULTIPLE_REGISTERS, 3);
        }
        let Some(bank) = state.units.get_mut(&unit) else {
            return exception(function::WRITE_MULTIPLE_REGISTERS, 4);
        };
        for offset in 0..count {
            let at = 6 + offset as usize * 2;
            let word = u16::from_be_bytes([pdu[at], pdu[at + 1]]);
            bank.holding.insert(addr + offset, word);
        }
        // echo: fc, address, quantity
        pdu[..5].to_vec()
    }
}

fn parse_addr_count(pdu: &[u8]) -> Option<(u16, u16)> {
    if pdu.len() < 5 {
        return None;
    }
    let addr = u16::from_be_bytes([pdu[1], pdu[2]]);
    let count = u16::from_be_bytes([pdu[3], pdu[4]]);
    Some((addr, count))
}

fn exception(fc: u8, code: u8) -> Vec<u8> {
    vec![fc | 0x80, code]
}

fn frame_reply(unit: u8, pdu: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pdu.len() + 3);
    bytes.push(unit);
    bytes.extend_from_slice(pdu);
    let crc = crc16(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes
}
