//! Printer adapter selection

use std::time::Duration;

use puente_printer::{
    DEFAULT_CONNECT_TIMEOUT, NetworkPrinter, PrintError, PrintResult, Printer, SerialPrinter,
    UsbPrinter,
};
use shared::PrinterType;

/// Opens the adapter for a job's printer type and target
pub trait PrinterFactory: Send + Sync {
    fn open(&self, kind: PrinterType, target: &str) -> PrintResult<Box<dyn Printer>>;
}

/// Factory for the physical transports
#[derive(Debug, Clone)]
pub struct DeviceFactory {
    connect_timeout: Duration,
}

impl DeviceFactory {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Per-attempt transport timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for DeviceFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip the scheme prefixes the POS sometimes stores with the target
fn normalize_target(target: &str) -> &str {
    let target = target.trim();
    target
        .strip_prefix("tcp://")
        .or_else(|| target.strip_prefix("printer:"))
        .unwrap_or(target)
}

impl PrinterFactory for DeviceFactory {
    fn open(&self, kind: PrinterType, target: &str) -> PrintResult<Box<dyn Printer>> {
        let target = normalize_target(target);
        if target.is_empty() {
            return Err(PrintError::InvalidConfig(format!(
                "Empty printer target for {}",
                kind
            )));
        }

        match kind {
            PrinterType::Tcp => Ok(Box::new(
                NetworkPrinter::from_addr(target)?.with_timeout(self.connect_timeout),
            )),
            PrinterType::Usb => Ok(Box::new(
                UsbPrinter::new(target)?.with_timeout(self.connect_timeout),
            )),
            PrinterType::Serial => Ok(Box::new(
                SerialPrinter::from_target(target)?.with_timeout(self.connect_timeout),
            )),
            #[cfg(windows)]
            PrinterType::Win => Ok(Box::new(
                puente_printer::WindowsPrinter::new(target).with_timeout(self.connect_timeout),
            )),
            #[cfg(not(windows))]
            PrinterType::Win => Err(PrintError::Unsupported(format!(
                "Driver printing is not available on this platform ({})",
                target
            ))),
        }
    }
}
