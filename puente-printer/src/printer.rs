//! Printer adapters for sending ESC/POS data
//!
//! Supports:
//! - Network printers (TCP port 9100)
//! - Raw USB device files (see [`crate::UsbPrinter`])
//! - Serial ports (see [`crate::SerialPrinter`])
//! - Windows driver printers (via Win32 spooler)
//!
//! Every adapter bounds a single transport attempt with its own timeout
//! ([`DEFAULT_CONNECT_TIMEOUT`] unless overridden).

use crate::directive::Directive;
use crate::error::{PrintError, PrintResult};
use crate::escpos::encode_directives;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Per-attempt transport timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default raw printing port
const RAW_PORT: u16 = 9100;

/// Trait for printer adapters
#[async_trait]
pub trait Printer: Send + Sync {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;

    /// Short transport description for logs (`tcp:10.0.0.5:9100`)
    fn describe(&self) -> String;

    /// Encode and send a rendered ticket
    async fn execute(&self, directives: &[Directive]) -> PrintResult<()> {
        let data = encode_directives(directives);
        self.print(&data).await
    }
}

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
}

impl NetworkPrinter {
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    ///
    /// A bare IP uses port 9100.
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr = addr.trim();
        let parsed: SocketAddr = match addr.parse() {
            Ok(a) => a,
            Err(_) => format!("{}:{}", addr, RAW_PORT)
                .parse()
                .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?,
        };

        Ok(Self {
            addr: parsed,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?;

        info!("Connected, sending {} bytes", data.len());

        let write = async {
            stream.write_all(data).await?;
            stream.flush().await?;
            stream.shutdown().await
        };
        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| PrintError::Timeout(format!("Write timeout: {}", self.addr)))?
            .map_err(|e| {
                PrintError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Write failed: {}", e),
                ))
            })?;

        info!("Print job sent successfully");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!("tcp:{}", self.addr)
    }
}
