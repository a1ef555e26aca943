//! Custom template rendering
//!
//! Blocks are rendered top to bottom; the ticket always ends with a cut.

use chrono::NaiveDateTime;
use puente_printer::{Align, Directive};
use rust_decimal::Decimal;
use shared::{BlockAlign, TemplateBlock, TicketData, TicketTemplate};

use super::money;

/// Separator width when no paper width applies
const DEFAULT_LINE_WIDTH: usize = 32;
const DEFAULT_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const DEFAULT_TOTAL_LABEL: &str = "Total";

fn align(a: BlockAlign) -> Align {
    match a {
        BlockAlign::Left => Align::Left,
        BlockAlign::Center => Align::Center,
        BlockAlign::Right => Align::Right,
    }
}

/// `DD/MM/YYYY HH:mm` is the only pattern the POS designer emits
fn datetime_format(format: Option<&str>) -> &'static str {
    match format {
        Some("DD/MM/YYYY HH:mm") => "%d/%m/%Y %H:%M",
        _ => DEFAULT_DATETIME_FORMAT,
    }
}

/// Render a custom template against the ticket data
///
/// `now` feeds the `datetime` blocks.
pub fn render_template(
    template: &TicketTemplate,
    data: &TicketData,
    width: usize,
    now: NaiveDateTime,
) -> Vec<Directive> {
    let width = if width == 0 { DEFAULT_LINE_WIDTH } else { width };
    let mut out = Vec::new();

    for block in &template.blocks {
        match block {
            TemplateBlock::Text { value, align: a, bold } => {
                out.push(Directive::Align(align(*a)));
                if *bold {
                    out.push(Directive::Bold(true));
                }
                out.push(Directive::line(value.clone().unwrap_or_default()));
                if *bold {
                    out.push(Directive::Bold(false));
                }
            }
            TemplateBlock::Line {} => out.push(Directive::separator('-', width)),
            TemplateBlock::Datetime { align: a, format } => {
                out.push(Directive::Align(align(*a)));
                out.push(Directive::line(
                    now.format(datetime_format(format.as_deref())).to_string(),
                ));
            }
            TemplateBlock::Table { columns } => table(&mut out, columns, data, width),
            TemplateBlock::Total { label } => {
                out.push(Directive::Align(Align::Right));
                out.push(Directive::line(format!(
                    "{}: {}",
                    label.as_deref().unwrap_or(DEFAULT_TOTAL_LABEL),
                    money(data.total_amount())
                )));
            }
            TemplateBlock::Unknown => {
                tracing::warn!(template = ?template.name, "Skipping unknown template block");
            }
        }
    }

    out.push(Directive::Cut);
    out
}

/// `price × qty`, 0 when the product does not fit a decimal
fn extended_price(price: Decimal, qty: i64) -> Decimal {
    price.checked_mul(Decimal::from(qty)).unwrap_or_else(|| {
        tracing::warn!(%price, qty, "Line amount overflows, printing 0");
        Decimal::ZERO
    })
}

fn table(out: &mut Vec<Directive>, columns: &[String], data: &TicketData, width: usize) {
    out.push(Directive::Align(Align::Left));
    if !columns.is_empty() {
        out.push(Directive::line(columns.join(" | ")));
        out.push(Directive::separator('-', width));
    }

    let detailed = columns.iter().any(|c| c == "Producto");
    for item in &data.items {
        let qty = item.quantity();
        let price = item.line_total();
        let line = if detailed {
            format!(
                "{} | {} | {} | {}",
                qty,
                item.product_name(),
                money(price),
                money(extended_price(price, qty))
            )
        } else {
            format!("{} x {} - {}", qty, item.product_name(), money(price))
        };
        out.push(Directive::line(line));
        if let Some(note) = item.note() {
            out.push(Directive::line(format!("  Nota: {}", note)));
        }
    }
}
