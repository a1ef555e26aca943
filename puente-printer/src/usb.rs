//! Raw USB printers exposed as device files (`/dev/usb/lp0`)

use crate::error::{PrintError, PrintResult};
use crate::printer::{DEFAULT_CONNECT_TIMEOUT, Printer};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument, warn};

/// Linux usblp device directory
const USB_LP_DIR: &str = "/dev/usb";

/// USB printer written through its device file
#[derive(Debug, Clone)]
pub struct UsbPrinter {
    path: PathBuf,
    timeout: Duration,
}

impl UsbPrinter {
    pub fn new(path: impl Into<PathBuf>) -> PrintResult<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(PrintError::InvalidConfig("Empty USB device path".into()));
        }
        Ok(Self {
            path,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Printer for UsbPrinter {
    #[instrument(skip(self, data), fields(device = %self.path.display(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let write = async {
            let mut device = tokio::fs::OpenOptions::new()
                .write(true)
                .open(&self.path)
                .await
                .map_err(|e| {
                    PrintError::Connection(format!("{}: {}", self.path.display(), e))
                })?;
            device.write_all(data).await?;
            device.flush().await?;
            Ok::<(), PrintError>(())
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| PrintError::Timeout(format!("USB write timeout: {}", self.path.display())))??;

        info!("Print job written to device");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => true,
            Err(e) => {
                warn!(device = %self.path.display(), error = %e, "USB device missing");
                false
            }
        }
    }

    fn describe(&self) -> String {
        format!("usb:{}", self.path.display())
    }
}

/// `lp*` device files under `/dev/usb`
pub(crate) fn list_devices() -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(USB_LP_DIR) else {
        return Vec::new();
    };

    let mut devices: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with("lp"))
        .map(|e| e.path().display().to_string())
        .collect();
    devices.sort();
    devices
}
