use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use tokio::sync::Mutex;

use super::frame::{self, CrcMode, FUNC_READ_HOLDING_REGISTERS};
use super::transport::TcpTransport;
use crate::utils::error::ModbusError;

/// Enough for the largest response this stack requests (8 registers).
const MAX_RESPONSE_LEN: usize = 256;

#[async_trait]
pub trait ModbusClientTrait: Send + Sync {
    async fn read_holding_registers(
        &self,
        slave_id: u8,
        start_register: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError>;
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub crc_mode: CrcMode,
}

impl Default for ClientOptions {
    fn default() -> Self {
        // Timeout and retry count carried over from the deployed collector.
        Self {
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            crc_mode: CrcMode::Lenient,
        }
    }
}

/// One session to one device: a single request in flight at a time, each
/// poll a synchronous request/response round trip. The mutex only serializes
/// calls through `&self`; connections are never shared between devices.
pub struct ModbusClient {
    host: String,
    port: u16,
    options: ClientOptions,
    transport: Mutex<Option<TcpTransport>>,
}

impl ModbusClient {
    /// Session that dials on the first read. Lets the poll service come up
    /// even while some devices are offline.
    pub fn new(host: &str, port: u16, options: ClientOptions) -> Self {
        Self {
            host: host.to_string(),
            port,
            options,
            transport: Mutex::new(None),
        }
    }

    /// Session with an eagerly established connection.
    pub async fn connect(host: &str, port: u16, options: ClientOptions) -> Result<Self, ModbusError> {
        let client = Self::new(host, port, options);
        {
            let mut guard = client.transport.lock().await;
            *guard = Some(client.dial().await?);
        }
        Ok(client)
    }

    async fn dial(&self) -> Result<TcpTransport, ModbusError> {
        TcpTransport::connect(
            &self.host,
            self.port,
            self.options.connect_timeout,
            self.options.max_retries,
            self.options.retry_delay,
        )
        .await
    }

    async fn exchange(
        transport: &mut TcpTransport,
        request: &[u8],
        response_timeout: Duration,
    ) -> Result<Vec<u8>, ModbusError> {
        transport.send(request).await?;
        transport.receive(MAX_RESPONSE_LEN, response_timeout).await
    }

    /// Idempotent; teardown failures are logged inside the transport.
    pub async fn close(&self) {
        let mut guard = self.transport.lock().await;
        if let Some(transport) = guard.as_mut() {
            transport.close().await;
        }
        *guard = None;
    }
}

#[async_trait]
impl ModbusClientTrait for ModbusClient {
    async fn read_holding_registers(
        &self,
        slave_id: u8,
        start_register: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        let mut guard = self.transport.lock().await;
        if guard.is_none() {
            *guard = Some(self.dial().await?);
        }

        let request =
            frame::build_read_request(slave_id, FUNC_READ_HOLDING_REGISTERS, start_register, count);
        debug!("→ {} {}", self.host, hex::encode(&request));

        let raw = {
            let transport = guard.as_mut().ok_or(ModbusError::ConnectionClosed)?;
            match Self::exchange(transport, &request, self.options.response_timeout).await {
                Ok(raw) => raw,
                Err(e) => {
                    // Socket state is unknown after a transport failure; drop
                    // it and redial on the next poll.
                    if let Some(mut dead) = guard.take() {
                        dead.close().await;
                    }
                    return Err(e);
                }
            }
        };
        drop(guard);

        debug!("← {} {}", self.host, hex::encode(&raw));
        frame::decode_response(&raw, count, self.options.crc_mode)
    }
}
