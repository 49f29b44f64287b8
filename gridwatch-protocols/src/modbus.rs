//! Modbus/TCP application-layer parsing.
//!
//! A Modbus/TCP frame opens with the 7-byte MBAP header (transaction id,
//! protocol id, length, unit id) followed by the function code. GridWatch
//! classifies the function code to spot write requests; everything after the
//! function code is carried as an opaque payload slice.

use thiserror::Error;

/// MBAP header length in bytes.
pub const MBAP_LEN: usize = 7;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ModbusParseError {
    /// The payload is too short to contain an MBAP header and function code.
    #[error("insufficient data to parse Modbus frame")]
    InsufficientData,
}

/// Modbus function code, classified by what it does to field devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModbusFunction {
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleRegisters,
    Other(u8),
}

impl ModbusFunction {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x05 => ModbusFunction::WriteSingleCoil,
            0x06 => ModbusFunction::WriteSingleRegister,
            0x10 => ModbusFunction::WriteMultipleRegisters,
            other => ModbusFunction::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match *self {
            ModbusFunction::WriteSingleCoil => 0x05,
            ModbusFunction::WriteSingleRegister => 0x06,
            ModbusFunction::WriteMultipleRegisters => 0x10,
            ModbusFunction::Other(code) => code,
        }
    }

    /// True for the function codes that mutate field-device state.
    pub fn is_write(&self) -> bool {
        !matches!(self, ModbusFunction::Other(_))
    }
}

/// Parsed Modbus/TCP frame with a zero-copy payload slice.
#[derive(Clone, Copy, Debug)]
pub struct ModbusFrame<'a> {
    pub transaction_id: u16,
    pub protocol_id: u16,
    pub length: u16,
    pub unit_id: u8,
    pub function: ModbusFunction,
    /// Bytes following the function code.
    pub data: &'a [u8],
}

impl<'a> ModbusFrame<'a> {
    /// Parses a Modbus frame from a TCP payload.
    ///
    /// Only the structural minimum is enforced: an MBAP header plus the
    /// function code. Length and protocol-id fields are carried through
    /// without being checked.
    pub fn parse(data: &'a [u8]) -> Result<Self, ModbusParseError> {
        if data.len() < MBAP_LEN + 1 {
            return Err(ModbusParseError::InsufficientData);
        }

        Ok(Self {
            transaction_id: u16::from_be_bytes([data[0], data[1]]),
            protocol_id: u16::from_be_bytes([data[2], data[3]]),
            length: u16::from_be_bytes([data[4], data[5]]),
            unit_id: data[6],
            function: ModbusFunction::from_code(data[7]),
            data: &data[MBAP_LEN + 1..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_read_holding_registers() {
        let payload = [
            0x00, 0x01, // transaction id
            0x00, 0x00, // protocol id
            0x00, 0x06, // length
            0x01, // unit id
            0x03, // Read Holding Registers
            0x00, 0x00, // start address
            0x00, 0x01, // quantity
        ];

        let frame = ModbusFrame::parse(&payload).unwrap();
        assert_eq!(frame.transaction_id, 1);
        assert_eq!(frame.protocol_id, 0);
        assert_eq!(frame.length, 6);
        assert_eq!(frame.unit_id, 1);
        assert_eq!(frame.function, ModbusFunction::Other(0x03));
        assert!(!frame.function.is_write());
        assert_eq!(frame.data, &[0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn classifies_write_functions() {
        for code in [0x05u8, 0x06, 0x10] {
            let function = ModbusFunction::from_code(code);
            assert!(function.is_write(), "0x{code:02X} must classify as write");
            assert_eq!(function.code(), code);
        }
        assert!(!ModbusFunction::from_code(0x03).is_write());
        assert!(!ModbusFunction::from_code(0x04).is_write());
    }

    #[test]
    fn rejects_truncated_mbap() {
        let payload = [0x00, 0x01, 0x00, 0x00, 0x00];
        assert!(matches!(
            ModbusFrame::parse(&payload),
            Err(ModbusParseError::InsufficientData)
        ));
    }

    #[test]
    fn rejects_frame_cut_before_function_code() {
        let payload = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01];
        assert!(matches!(
            ModbusFrame::parse(&payload),
            Err(ModbusParseError::InsufficientData)
        ));
    }

    #[test]
    fn parses_write_single_register() {
        let payload = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, // MBAP
            0x06, // Write Single Register
            0x00, 0x01, 0x00, 0xFF, // address + value
        ];

        let frame = ModbusFrame::parse(&payload).unwrap();
        assert_eq!(frame.function, ModbusFunction::WriteSingleRegister);
        assert!(frame.function.is_write());
    }
}
