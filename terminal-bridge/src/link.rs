//! Terminal link trait and the raw TCP implementation

use crate::error::{Result, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A single request/response exchange with a terminal
///
/// Implementations perform exactly one exchange and never retry.
#[async_trait]
pub trait TerminalLink: Send + Sync {
    /// Send `payload` to the terminal at `addr` and return its response.
    ///
    /// The whole exchange (connect, write, read) runs under `timeout`.
    async fn exchange(&self, addr: &str, payload: &[u8], timeout: Duration) -> Result<Vec<u8>>;

    /// Link name for logging
    fn name(&self) -> &str;
}

/// Raw TCP link
///
/// The payload is an opaque printable blob; the terminal answers with its
/// own frame in the same envelope and closes the connection when done.
#[derive(Debug, Clone, Default)]
pub struct TcpLink;

impl TcpLink {
    /// Create a TCP link
    pub fn new() -> Self {
        Self
    }

    async fn exchange_inner(addr: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(payload).await?;
        stream.flush().await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;

        if response.is_empty() {
            return Err(TransportError::ConnectionReset);
        }
        Ok(response)
    }
}

#[async_trait]
impl TerminalLink for TcpLink {
    async fn exchange(&self, addr: &str, payload: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        match tokio::time::timeout(timeout, Self::exchange_inner(addr, payload)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    fn name(&self) -> &str {
        "tcp"
    }
}
