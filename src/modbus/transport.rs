use bytes::BytesMut;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use crate::utils::error::ModbusError;

/// Raw duplex byte stream to one device. All Modbus framing lives above this
/// layer; the transport only moves bytes and enforces timeouts.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    peer: String,
}

impl TcpTransport {
    /// Establish a TCP connection, retrying up to `max_retries` additional
    /// times. Each attempt is bounded by `connect_timeout` and followed by a
    /// read-only connectivity probe, so a half-open socket never counts as
    /// connected.
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, ModbusError> {
        let peer = format!("{}:{}", host, port);
        info!("🔌 Connecting to Modbus device at {}", peer);

        let mut last_error = String::from("no connection attempt made");
        for attempt in 0..=max_retries {
            if attempt > 0 {
                debug!(
                    "Retrying connection to {} (attempt {}/{})",
                    peer,
                    attempt + 1,
                    max_retries + 1
                );
                sleep(retry_delay).await;
            }

            match timeout(connect_timeout, TcpStream::connect(peer.as_str())).await {
                Ok(Ok(stream)) => match Self::probe(&stream, connect_timeout).await {
                    Ok(()) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY on {}: {}", peer, e);
                        }
                        info!("✅ Device connection established: {}", peer);
                        return Ok(Self {
                            stream: Some(stream),
                            peer,
                        });
                    }
                    Err(e) => last_error = e,
                },
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("handshake timed out after {:?}", connect_timeout)
                }
            }
        }

        Err(ModbusError::ConnectError(format!("{}: {}", peer, last_error)))
    }

    /// Post-handshake check that the socket is actually usable. Distinguishes
    /// "cannot reach device" from "device reachable but errored".
    async fn probe(stream: &TcpStream, probe_timeout: Duration) -> Result<(), String> {
        match timeout(probe_timeout, stream.writable()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(format!("connectivity probe failed: {}", e)),
            Err(_) => Err("connectivity probe timed out".to_string()),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Write a complete frame to the stream.
    pub async fn send(&mut self, frame: &[u8]) -> Result<(), ModbusError> {
        let stream = self.stream.as_mut().ok_or(ModbusError::ConnectionClosed)?;
        stream.write_all(frame).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read whatever the device sends next, up to `max_len` bytes. Blocks at
    /// most `read_timeout`; a clean EOF maps to `ConnectionClosed`.
    pub async fn receive(
        &mut self,
        max_len: usize,
        read_timeout: Duration,
    ) -> Result<Vec<u8>, ModbusError> {
        let stream = self.stream.as_mut().ok_or(ModbusError::ConnectionClosed)?;
        let mut buf = BytesMut::with_capacity(max_len);
        let n = timeout(read_timeout, stream.read_buf(&mut buf)).await??;
        if n == 0 {
            return Err(ModbusError::ConnectionClosed);
        }
        Ok(buf.to_vec())
    }

    /// Idempotent teardown. Shutdown failures are logged, never propagated;
    /// an active read is unblocked by the socket going away.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            match stream.shutdown().await {
                Ok(()) => info!("Closed device connection: {}", self.peer),
                Err(e) => warn!("Error while closing connection to {}: {}", self.peer, e),
            }
        }
    }
}
