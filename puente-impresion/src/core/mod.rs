//! Bridge core: configuration, errors and the broker-to-printer wiring

pub mod bridge;
pub mod config;
pub mod error;

pub use bridge::{Bridge, print_sample, shutdown_signal};
pub use config::{Config, PrintingConfig};
pub use error::{BridgeError, BridgeResult, ConfigError};
