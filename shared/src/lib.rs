//! Shared types for the print bridge
//!
//! Wire model of print jobs as published by the POS backend and consumed by
//! the bridge process, plus the broker destinations both sides agree on.

pub mod error;
pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use error::ValidationError;
pub use message::{JOB_SUBMIT_DESTINATION, JOB_TOPIC, JSON_CONTENT_TYPE};
pub use models::{
    BlockAlign, FechaHora, PrintJob, PrinterType, TemplateBlock, TicketData, TicketItem,
    TicketTemplate, TicketType,
};
pub use serde::{Deserialize, Serialize};
