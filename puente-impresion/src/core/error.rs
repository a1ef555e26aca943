//! Bridge error types

use puente_printer::PrintError;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Top-level bridge error
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Printer error: {0}")]
    Printer(#[from] PrintError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
