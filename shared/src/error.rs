//! Validation errors for print job payloads

use thiserror::Error;

/// Reasons a print job is rejected before it reaches a printer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `ticketData.nombreMesa` missing or blank
    #[error("nombreMesa is required")]
    MissingTableName,

    /// `ticketData.items` missing or empty
    #[error("ticket must contain at least one item")]
    NoItems,

    /// `printerTarget` missing or blank
    #[error("printerTarget is required")]
    MissingPrinterTarget,
}
