pub mod client;
pub mod crc;
pub mod frame;
pub mod transport;

pub use client::{ClientOptions, ModbusClient, ModbusClientTrait};
pub use crc::crc16_modbus;
pub use frame::{build_read_request, decode_response, CrcMode};
pub use transport::TcpTransport;
