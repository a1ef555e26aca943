//! # puente-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - Printer directives (align, bold, line, feed, cut) and their ESC/POS bytes
//! - CP437 encoding for Spanish text (with a PC858 escape for `€`)
//! - Network printing (TCP port 9100)
//! - Raw USB device printing (`/dev/usb/lp0`)
//! - Serial port printing
//! - Windows driver printing (windows only)
//!
//! Business logic (WHAT to print) stays in the bridge:
//! - Kitchen / cashier ticket rendering → puente-impresion
//!
//! ## Example
//!
//! ```ignore
//! use puente_printer::{Align, Directive, NetworkPrinter, Printer};
//!
//! let ticket = vec![
//!     Directive::Align(Align::Center),
//!     Directive::line("COCINA"),
//!     Directive::Align(Align::Left),
//!     Directive::line("Mesa: 4"),
//!     Directive::Cut,
//! ];
//!
//! let printer = NetworkPrinter::from_addr("192.168.1.100:9100")?;
//! printer.execute(&ticket).await?;
//! ```

mod directive;
mod encoding;
mod error;
mod escpos;
mod printer;
mod serial;
#[cfg(windows)]
mod spooler;
mod usb;

// Re-exports
pub use directive::{Align, Directive, TextSize, to_plain_text};
pub use encoding::{convert_to_cp437, pad_chars, text_width, truncate_chars};
pub use error::{PrintError, PrintResult};
pub use escpos::{EscPosBuilder, encode_directives};
pub use printer::{DEFAULT_CONNECT_TIMEOUT, NetworkPrinter, Printer};
pub use serial::{DEFAULT_BAUD_RATE, SerialPrinter};
pub use usb::UsbPrinter;

#[cfg(windows)]
pub use spooler::WindowsPrinter;

/// List locally attached printers
///
/// Windows: installed driver printers. Elsewhere: serial ports and raw USB
/// printer device files.
pub fn list_printers() -> PrintResult<Vec<String>> {
    #[cfg(windows)]
    {
        WindowsPrinter::list()
    }

    #[cfg(not(windows))]
    {
        let mut found = usb::list_devices();
        found.extend(serial::list_ports());
        Ok(found)
    }
}
