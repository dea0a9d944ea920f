use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::{Address, Config, Protocol};
use crate::metrics::{MetricSet, CLIENT_KEY};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connecting to {address} timed out")]
    ConnectTimeout { address: String },

    #[error("connecting to {address} failed: {source}")]
    Connect { address: String, source: io::Error },

    #[error("{address} did not resolve to any address")]
    NoAddresses { address: String },

    #[error("send error: {0}")]
    Write(io::Error),
}

// ─── Sender capability ───────────────────────────────────────────

/// Ships one cycle's metrics somewhere.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Takes ownership of the set, returns the number of bytes written.
    async fn send(&self, metrics: MetricSet) -> Result<usize, TransportError>;
}

/// Writes each set as one JSON document to Logstash, opening a new
/// connection (or datagram socket) per send.
#[derive(Debug, Clone)]
pub struct LogstashSender {
    address: Address,
    protocol: Protocol,
    namespace: String,
}

impl LogstashSender {
    pub fn new(address: Address, protocol: Protocol, namespace: impl Into<String>) -> Self {
        Self {
            address,
            protocol,
            namespace: namespace.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.logstash.clone(),
            config.logstash_protocol,
            config.project.as_str(),
        )
    }

    /// Stamps the set with the `client` label and encodes it.
    pub fn prepare(&self, mut metrics: MetricSet) -> Result<Vec<u8>, TransportError> {
        metrics.insert_label(CLIENT_KEY, format!("{}-redis", self.namespace));
        Ok(serde_json::to_vec(&metrics)?)
    }

    async fn send_tcp(&self, payload: &[u8]) -> Result<usize, TransportError> {
        let address = self.address.to_string();
        let mut stream = timeout(
            CONNECT_TIMEOUT,
            TcpStream::connect((self.address.host.as_str(), self.address.port)),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            address: address.clone(),
        })?
        .map_err(|source| TransportError::Connect { address, source })?;

        stream.write_all(payload).await.map_err(TransportError::Write)?;
        stream.flush().await.map_err(TransportError::Write)?;

        Ok(payload.len())
    }

    async fn send_udp(&self, payload: &[u8]) -> Result<usize, TransportError> {
        let address = self.address.to_string();
        let socket = timeout(CONNECT_TIMEOUT, self.connect_udp())
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                address: address.clone(),
            })??;

        socket.send(payload).await.map_err(TransportError::Write)
    }

    async fn connect_udp(&self) -> Result<UdpSocket, TransportError> {
        let address = self.address.to_string();
        let connect_err = |source| TransportError::Connect {
            address: address.clone(),
            source,
        };

        let remote = tokio::net::lookup_host((self.address.host.as_str(), self.address.port))
            .await
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| TransportError::NoAddresses {
                address: address.clone(),
            })?;

        let socket = UdpSocket::bind(bind_address(&remote))
            .await
            .map_err(connect_err)?;
        socket.connect(remote).await.map_err(connect_err)?;

        Ok(socket)
    }
}

#[async_trait]
impl Sender for LogstashSender {
    async fn send(&self, metrics: MetricSet) -> Result<usize, TransportError> {
        let payload = self.prepare(metrics)?;
        debug!(payload = %String::from_utf8_lossy(&payload), "sending metrics");

        // the socket is dropped, and so closed, before returning on every path
        let sent = match self.protocol {
            Protocol::Tcp => self.send_tcp(&payload).await?,
            Protocol::Udp => self.send_udp(&payload).await?,
        };

        info!(
            bytes = sent,
            address = %self.address,
            protocol = %self.protocol,
            "metrics sent"
        );
        Ok(sent)
    }
}

fn bind_address(remote: &SocketAddr) -> SocketAddr {
    match remote {
        SocketAddr::V4(_) => SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        SocketAddr::V6(_) => SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), 0),
    }
}
