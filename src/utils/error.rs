use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModbusError {
    #[error("Connection error: {0}")]
    ConnectError(String),

    #[error("Timeout waiting for device response")]
    Timeout,

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Response too short ({0} bytes)")]
    ShortResponse(usize),

    #[error("CRC checksum mismatch (computed {expected:#06x}, received {actual:#06x})")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("Device exception {code:#04x}: {message}")]
    DeviceError { code: u8, message: &'static str },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ModbusError {
    /// Transport-level failures leave the socket in an unknown state; the
    /// session must reconnect before the next request.
    pub fn is_transport_fatal(&self) -> bool {
        matches!(
            self,
            ModbusError::ConnectError(_)
                | ModbusError::Timeout
                | ModbusError::ConnectionClosed
                | ModbusError::CommunicationError(_)
        )
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => ModbusError::ConnectionClosed,
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ModbusError::Timeout,
            _ => ModbusError::CommunicationError(format!("IO error: {}", err)),
        }
    }
}

impl From<tokio::time::error::Elapsed> for ModbusError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        ModbusError::Timeout
    }
}
