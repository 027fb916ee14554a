//! STOMP session adapter.
//!
//! Publish-only STOMP 1.2 over plain TCP. Each session lives for exactly
//! one connect -> publish -> close cycle; no subscriptions, transactions,
//! or heartbeats. Within an endpoint group the first member that accepts a
//! connection and completes the handshake wins.

pub mod frame;

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use self::frame::Frame;
use super::{BusError, Connector, Endpoint, EndpointGroup, Result, Session};

/// Configuration for STOMP sessions.
#[derive(Debug, Clone)]
pub struct StompConfig {
    /// Virtual host sent in the CONNECT frame.
    pub virtual_host: String,
    /// Per-operation I/O timeout.
    pub io_timeout: Duration,
}

impl Default for StompConfig {
    fn default() -> Self {
        Self {
            virtual_host: "/".to_string(),
            io_timeout: Duration::from_secs(10),
        }
    }
}

/// Opens STOMP sessions, trying each member of a group in order.
#[derive(Debug, Clone, Default)]
pub struct StompConnector {
    config: StompConfig,
}

impl StompConnector {
    pub fn new(config: StompConfig) -> Self {
        Self { config }
    }

    async fn handshake(&self, endpoint: &Endpoint) -> Result<StompSession> {
        let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        let stream = timeout(self.config.io_timeout, connect)
            .await
            .map_err(|_| BusError::Connect(format!("{}: connect timed out", endpoint)))?
            .map_err(|e| BusError::Connect(format!("{}: {}", endpoint, e)))?;

        let mut session = StompSession {
            stream,
            io_timeout: self.config.io_timeout,
        };
        session
            .write_frame(&Frame::connect(&self.config.virtual_host))
            .await
            .map_err(BusError::Connect)?;

        let reply = session.read_frame().await?;
        match reply.command.as_str() {
            "CONNECTED" => {
                debug!(endpoint = %endpoint, "STOMP session established");
                Ok(session)
            }
            "ERROR" => Err(BusError::Connect(format!(
                "{}: {}",
                endpoint,
                reply.header_value("message").unwrap_or("broker error")
            ))),
            other => Err(BusError::Connect(format!(
                "{}: unexpected {} frame during handshake",
                endpoint, other
            ))),
        }
    }
}

#[async_trait]
impl Connector for StompConnector {
    async fn open(&self, group: &EndpointGroup) -> Result<Box<dyn Session>> {
        let mut last_error = BusError::Connect("endpoint group is empty".to_string());
        for endpoint in &group.endpoints {
            match self.handshake(endpoint).await {
                Ok(session) => return Ok(Box::new(session)),
                Err(error) => {
                    warn!(endpoint = %endpoint, %error, "Failover candidate unreachable");
                    last_error = error;
                }
            }
        }
        Err(last_error)
    }
}

/// One open STOMP session.
pub struct StompSession {
    stream: TcpStream,
    io_timeout: Duration,
}

impl StompSession {
    async fn write_frame(&mut self, frame: &Frame) -> std::result::Result<(), String> {
        let bytes = frame.encode();
        timeout(self.io_timeout, self.stream.write_all(&bytes))
            .await
            .map_err(|_| format!("{} write timed out", frame.command))?
            .map_err(|e| e.to_string())
    }

    /// Read one NUL-terminated frame, skipping heartbeat newlines.
    async fn read_frame(&mut self) -> Result<Frame> {
        let mut raw = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = timeout(self.io_timeout, self.stream.read(&mut byte))
                .await
                .map_err(|_| BusError::Connect("read timed out".to_string()))?
                .map_err(|e| BusError::Connect(e.to_string()))?;
            if n == 0 {
                return Err(BusError::Connect(
                    "broker closed the connection".to_string(),
                ));
            }
            if raw.is_empty() && (byte[0] == b'\n' || byte[0] == b'\r') {
                continue;
            }
            if byte[0] == 0 {
                break;
            }
            raw.push(byte[0]);
        }

        Frame::parse(&raw).map_err(|e| BusError::Connect(e.to_string()))
    }
}

#[async_trait]
impl Session for StompSession {
    async fn send(&mut self, destination: &str, body: &[u8]) -> Result<()> {
        self.write_frame(&Frame::send(destination, body))
            .await
            .map_err(BusError::Publish)
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(error) = self.write_frame(&Frame::disconnect()).await {
            debug!(%error, "DISCONNECT not delivered");
        }
        let _ = self.stream.shutdown().await;
        Ok(())
    }
}
