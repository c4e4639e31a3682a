//! Modbus RTU-over-TCP temperature acquisition.
//!
//! Polls PK9019 thermocouple multiplexers and temperature-humidity probes
//! that speak serial-style Modbus frames directly on a TCP socket, without
//! MBAP encapsulation. The crate owns framing, CRC and register decoding
//! end to end; the transport is a plain byte stream.

pub mod cli;
pub mod config;
pub mod devices;
pub mod modbus;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use devices::{ChannelReading, Device, DeviceData, Pk9019Device, TempHumidityDevice};
pub use modbus::{ClientOptions, CrcMode, ModbusClient, ModbusClientTrait};
pub use services::PollService;
pub use utils::error::ModbusError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
