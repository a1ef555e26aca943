//! Ticket printing
//!
//! - `renderer`: built-in kitchen (COCINA) and cashier (CAJA) layouts
//! - `template`: custom templates designed in the POS
//! - `factory`: printer adapter selection by printer type
//! - `executor`: at-most-one job in flight, bounded by a timeout

pub mod executor;
pub mod factory;
pub mod renderer;
pub mod template;

pub use executor::{JobError, JobHandle, JobReport, PRINT_TIMEOUT, PrintExecutor};
pub use factory::{DeviceFactory, PrinterFactory};
pub use renderer::TicketRenderer;
pub use template::render_template;

use rust_decimal::Decimal;

/// `$12.50`
pub(crate) fn money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}
