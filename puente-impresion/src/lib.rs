//! Puente de Impresión - POS print bridge
//!
//! Subscribes to the POS broker's print job topic over STOMP/WebSocket and
//! prints each job on a local thermal printer.
//!
//! # Module layout
//!
//! ```text
//! puente-impresion/src/
//! ├── core/       # configuration, errors, bridge wiring
//! ├── printing/   # ticket rendering, printer factory, job executor
//! ├── utils/      # logging
//! └── cli.rs      # command line
//! ```

pub mod cli;
pub mod core;
pub mod printing;
pub mod utils;

// Re-exports
pub use core::{Bridge, BridgeError, BridgeResult, Config, ConfigError, PrintingConfig};
pub use printing::{
    DeviceFactory, JobError, JobHandle, JobReport, PrintExecutor, PrinterFactory, TicketRenderer,
};
pub use utils::logger::{init_logger, init_logger_with_file};

pub fn print_banner() {
    println!(
        r#"
    ____                   __
   / __ \__  _____  ____  / /____
  / /_/ / / / / _ \/ __ \/ __/ _ \
 / ____/ /_/ /  __/ / / / /_/  __/
/_/    \__,_/\___/_/ /_/\__/\___/
        de Impresión v{}
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
