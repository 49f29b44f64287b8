//! ## gridwatch-protocols
//! Zero-copy inspection of the layered headers GridWatch cares about:
//! IPv4/TCP framing (capture-offset aware) and the Modbus/TCP application
//! layer spoken by SCADA field devices on port 502.

pub mod frame;
pub mod modbus;

pub use frame::FrameView;
pub use modbus::{ModbusFrame, ModbusFunction, ModbusParseError};

/// Well-known Modbus/TCP port.
pub const MODBUS_TCP_PORT: u16 = 502;
