//! Windows driver printers via the Win32 spooler (RAW datatype)

use crate::error::{PrintError, PrintResult};
use crate::printer::{DEFAULT_CONNECT_TIMEOUT, Printer};
use async_trait::async_trait;
use core::ffi::c_void;
use std::time::Duration;
use tracing::{info, instrument};
use windows::Win32::Graphics::Printing::{
    ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, EnumPrintersW, GetPrinterW,
    OpenPrinterW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_HANDLE, PRINTER_INFO_5W,
    PRINTER_INFO_6, PRINTER_STATUS_OFFLINE, StartDocPrinterW, StartPagePrinter, WritePrinter,
};
use windows::core::{PCWSTR, PWSTR};

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn spooler_err(call: &str, name: &str) -> PrintError {
    PrintError::WindowsPrinter(format!("{} failed for {}", call, name))
}

/// Ports that never reach paper (PDF, XPS, OneNote, file prompts)
fn is_virtual_port(port: &str) -> bool {
    let p = port.to_lowercase();
    matches!(p.as_str(), "file:" | "portprompt:" | "xpsport:" | "nul:")
        || p.starts_with("onenote")
        || p.starts_with("wfsport:")
}

/// Open spooler handle, closed on drop
struct SpoolerHandle {
    raw: PRINTER_HANDLE,
}

impl SpoolerHandle {
    fn open(name: &str) -> PrintResult<Self> {
        let name_w = to_wide(name);
        let mut raw = PRINTER_HANDLE::default();
        unsafe { OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut raw, None) }
            .map_err(|_| spooler_err("OpenPrinterW", name))?;
        Ok(Self { raw })
    }

    fn is_marked_offline(&self) -> bool {
        unsafe {
            let mut needed: u32 = 0;
            let _ = GetPrinterW(self.raw, 6, None, &mut needed);
            if needed == 0 {
                return false;
            }
            let mut buf: Vec<u8> = vec![0; needed as usize];
            if GetPrinterW(self.raw, 6, Some(buf.as_mut_slice()), &mut needed).is_err() {
                return false;
            }
            let info = *(buf.as_ptr() as *const PRINTER_INFO_6);
            info.dwStatus & PRINTER_STATUS_OFFLINE != 0
        }
    }

    /// One RAW document, one page
    fn write_document(&self, name: &str, data: &[u8]) -> PrintResult<()> {
        let doc_name_w = to_wide("Ticket");
        let datatype_w = to_wide("RAW");
        let doc_info = DOC_INFO_1W {
            pDocName: PWSTR(doc_name_w.as_ptr() as *mut _),
            pOutputFile: PWSTR::null(),
            pDatatype: PWSTR(datatype_w.as_ptr() as *mut _),
        };

        unsafe {
            if StartDocPrinterW(self.raw, 1, &doc_info as *const DOC_INFO_1W) == 0 {
                return Err(spooler_err("StartDocPrinter", name));
            }
            if !StartPagePrinter(self.raw).as_bool() {
                let _ = EndDocPrinter(self.raw);
                return Err(spooler_err("StartPagePrinter", name));
            }

            let mut written: u32 = 0;
            let ok = WritePrinter(
                self.raw,
                data.as_ptr() as *const c_void,
                data.len() as u32,
                &mut written,
            );
            let _ = EndPagePrinter(self.raw);
            let _ = EndDocPrinter(self.raw);

            if !ok.as_bool() {
                return Err(spooler_err("WritePrinter", name));
            }
            if written as usize != data.len() {
                return Err(PrintError::WindowsPrinter(format!(
                    "Incomplete write to {}: {}/{} bytes",
                    name,
                    written,
                    data.len()
                )));
            }
        }
        Ok(())
    }
}

impl Drop for SpoolerHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = ClosePrinter(self.raw);
        }
    }
}

/// Installed Windows printer addressed by driver name
#[derive(Debug, Clone)]
pub struct WindowsPrinter {
    name: String,
    timeout: Duration,
}

impl WindowsPrinter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// List installed physical printers (virtual ports filtered out)
    pub fn list() -> PrintResult<Vec<String>> {
        let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
        let mut needed: u32 = 0;
        let mut returned: u32 = 0;

        unsafe {
            let _ = EnumPrintersW(flags, None, 5, None, &mut needed, &mut returned);
            if needed == 0 {
                return Ok(Vec::new());
            }

            let mut buf: Vec<u8> = vec![0; needed as usize];
            EnumPrintersW(
                flags,
                None,
                5,
                Some(buf.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
            .map_err(|_| PrintError::WindowsPrinter("EnumPrintersW failed".to_string()))?;

            let infos = std::slice::from_raw_parts(
                buf.as_ptr() as *const PRINTER_INFO_5W,
                returned as usize,
            );

            Ok(infos
                .iter()
                .filter(|info| !info.pPrinterName.is_null())
                .filter_map(|info| {
                    let port = if info.pPortName.is_null() {
                        String::new()
                    } else {
                        PWSTR(info.pPortName.0).to_string().unwrap_or_default()
                    };
                    if is_virtual_port(&port) {
                        return None;
                    }
                    PWSTR(info.pPrinterName.0).to_string().ok()
                })
                .collect())
        }
    }

    fn spool(name: &str, data: &[u8]) -> PrintResult<()> {
        let handle = SpoolerHandle::open(name)?;
        if handle.is_marked_offline() {
            return Err(PrintError::Offline(name.to_string()));
        }
        handle.write_document(name, data)
    }
}

#[async_trait]
impl Printer for WindowsPrinter {
    #[instrument(skip(self, data), fields(printer = %self.name, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let name = self.name.clone();
        let data = data.to_vec();
        let job = tokio::task::spawn_blocking(move || WindowsPrinter::spool(&name, &data));

        tokio::time::timeout(self.timeout, job)
            .await
            .map_err(|_| PrintError::Timeout(format!("Spooler timeout: {}", self.name)))?
            .map_err(|e| PrintError::WindowsPrinter(format!("Spooler task failed: {}", e)))??;

        info!("Print job spooled");
        Ok(())
    }

    async fn is_online(&self) -> bool {
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || {
            SpoolerHandle::open(&name)
                .map(|h| !h.is_marked_offline())
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false)
    }

    fn describe(&self) -> String {
        format!("driver:{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_ports_filtered() {
        assert!(is_virtual_port("PORTPROMPT:"));
        assert!(is_virtual_port("OneNote Desktop"));
        assert!(!is_virtual_port("USB001"));
        assert!(!is_virtual_port("IP_192.168.1.50"));
    }
}
