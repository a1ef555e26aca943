//! Serial port printers (`/dev/ttyUSB0@19200`, `COM3`)

use crate::error::{PrintError, PrintResult};
use crate::printer::{DEFAULT_CONNECT_TIMEOUT, Printer};
use async_trait::async_trait;
use serial2_tokio::SerialPort;
use std::time::Duration;
use tracing::{info, instrument};

/// Baud rate when the target carries none
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial printer addressed as `path[@baud]`
#[derive(Debug, Clone)]
pub struct SerialPrinter {
    path: String,
    baud: u32,
    timeout: Duration,
}

impl SerialPrinter {
    pub fn new(path: &str, baud: u32) -> Self {
        Self {
            path: path.to_string(),
            baud,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Parse `path[@baud]`
    pub fn from_target(target: &str) -> PrintResult<Self> {
        let target = target.trim();
        let (path, baud) = match target.rsplit_once('@') {
            Some((path, baud)) => {
                let baud = baud
                    .parse::<u32>()
                    .map_err(|_| PrintError::InvalidConfig(format!("Invalid baud rate: {}", baud)))?;
                (path, baud)
            }
            None => (target, DEFAULT_BAUD_RATE),
        };

        if path.is_empty() {
            return Err(PrintError::InvalidConfig("Empty serial port path".into()));
        }
        Ok(Self::new(path, baud))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }
}

#[async_trait]
impl Printer for SerialPrinter {
    #[instrument(skip(self, data), fields(port = %self.path, baud = self.baud, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let port = SerialPort::open(&self.path, self.baud)
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.path, e)))?;

        let write = async {
            let mut sent = 0;
            while sent < data.len() {
                let n = port.write(&data[sent..]).await?;
                if n == 0 {
                    return Err(std::io::Error::from(std::io::ErrorKind::WriteZero));
                }
                sent += n;
            }
            Ok(())
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| PrintError::Timeout(format!("Serial write timeout: {}", self.path)))??;

        info!("Print job sent over serial");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        SerialPort::open(&self.path, self.baud).is_ok()
    }

    fn describe(&self) -> String {
        format!("serial:{}@{}", self.path, self.baud)
    }
}

/// Serial ports known to the OS
pub(crate) fn list_ports() -> Vec<String> {
    match SerialPort::available_ports() {
        Ok(paths) => paths.iter().map(|p| p.display().to_string()).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_without_baud() {
        let printer = SerialPrinter::from_target("/dev/ttyUSB0").unwrap();
        assert_eq!(printer.path(), "/dev/ttyUSB0");
        assert_eq!(printer.baud(), DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_target_with_baud() {
        let printer = SerialPrinter::from_target("COM3@19200").unwrap();
        assert_eq!(printer.path(), "COM3");
        assert_eq!(printer.baud(), 19200);
        assert_eq!(printer.describe(), "serial:COM3@19200");
    }

    #[test]
    fn test_bad_baud_rejected() {
        assert!(SerialPrinter::from_target("/dev/ttyS0@fast").is_err());
        assert!(SerialPrinter::from_target("@9600").is_err());
    }
}
