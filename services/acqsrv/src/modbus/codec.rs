//! Register codec: raw register words to typed values and back.
//!
//! Multi-register types use Modbus big-endian word order (ABCD): the first
//! register holds the high 16 bits. Write encoding rounds to the nearest
//! integer and clamps to the device type's range; non-finite floats are
//! rejected before they reach the bus.

use gridlink_model::{DataType, ScalarValue};

use crate::error::{AcqError, Result};

/// Decode register words read from a device into a typed value.
///
/// `device` determines the raw interpretation; `server` widens the result
/// into the engine-side representation (sign is preserved, integer kinds
/// stay integers, `f32` becomes a float).
pub fn decode_registers(words: &[u16], device: DataType, server: DataType) -> Result<ScalarValue> {
    let expected = device.register_count() as usize;
    if words.len() != expected {
        return Err(AcqError::FrameError(format!(
            "{device} needs {expected} register(s), got {}",
            words.len()
        )));
    }

    let raw = match device {
        DataType::I16 => ScalarValue::Integer(words[0] as i16 as i64),
        DataType::U16 => ScalarValue::Integer(words[0] as i64),
        DataType::I32 => {
            let bits = ((words[0] as u32) << 16) | words[1] as u32;
            ScalarValue::Integer(bits as i32 as i64)
        },
        DataType::U32 => {
            let bits = ((words[0] as u32) << 16) | words[1] as u32;
            ScalarValue::Integer(bits as i64)
        },
        DataType::F32 => {
            let bits = ((words[0] as u32) << 16) | words[1] as u32;
            ScalarValue::Float(f32::from_bits(bits) as f64)
        },
    };

    Ok(widen(raw, server))
}

/// Map a single bit (coil / discrete input) to 0 or 1.
pub fn decode_bit(bit: bool) -> ScalarValue {
    ScalarValue::Integer(i64::from(bit))
}

fn widen(raw: ScalarValue, server: DataType) -> ScalarValue {
    match (raw, server) {
        (ScalarValue::Integer(v), DataType::F32) => ScalarValue::Float(v as f64),
        (value, _) => value,
    }
}

/// Encode a write value into the register words for the device type.
///
/// The value is rounded to the nearest integer for integer kinds, then
/// clamped to the type's range; negatives become two's-complement words.
pub fn encode_value(value: f64, device: DataType) -> Result<Vec<u16>> {
    if !value.is_finite() {
        return Err(AcqError::InvalidValue(format!(
            "cannot write non-finite value {value}"
        )));
    }

    let words = match device {
        DataType::I16 => {
            let v = value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i64;
            // negative values go on the wire as value + 65536
            let word = if v < 0 { v + 65_536 } else { v };
            vec![word.clamp(0, u16::MAX as i64) as u16]
        },
        DataType::U16 => {
            let v = value.round().clamp(0.0, u16::MAX as f64) as u16;
            vec![v]
        },
        DataType::I32 => {
            let v = value.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
            split_u32(v as u32).to_vec()
        },
        DataType::U32 => {
            let v = value.round().clamp(0.0, u32::MAX as f64) as u32;
            split_u32(v).to_vec()
        },
        DataType::F32 => convert_float_to_registers(value as f32).to_vec(),
    };
    Ok(words)
}

/// Disassemble an IEEE-754 single into [high word, low word].
pub fn convert_float_to_registers(value: f32) -> [u16; 2] {
    split_u32(value.to_bits())
}

/// A coil write treats any nonzero value as ON.
pub fn encode_coil(value: f64) -> Result<bool> {
    if !value.is_finite() {
        return Err(AcqError::InvalidValue(format!(
            "cannot write non-finite value {value}"
        )));
    }
    Ok(value != 0.0)
}

fn split_u32(bits: u32) -> [u16; 2] {
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}

/// Parse the write request body value: a JSON number, or a string that
/// parses as decimal.
pub fn parse_write_value(value: &serde_json::Value) -> Result<f64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| AcqError::InvalidValue(format!("not a finite number: {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| AcqError::InvalidValue(format!("not a decimal number: {s:?}"))),
        other => Err(AcqError::InvalidValue(format!(
            "expected a number, got {other}"
        ))),
    }
}
