//! Print Job Model

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::template::TicketTemplate;
use crate::error::ValidationError;
use crate::util::{
    de_lenient_decimal, de_lenient_i64, de_null_as_default, de_opt_lenient_string,
    de_opt_or_none,
};

/// Printer transport selected by the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrinterType {
    /// Raw TCP socket, target `host:port`
    #[serde(alias = "tcp", alias = "NETWORK")]
    Tcp,
    /// Raw USB printer device, target is the device path
    #[serde(alias = "usb")]
    Usb,
    /// OS print driver, target is the driver name
    #[serde(alias = "win", alias = "DRIVER")]
    Win,
    /// Serial port, target `path[@baud]`
    #[serde(alias = "serial")]
    Serial,
}

impl fmt::Display for PrinterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterType::Tcp => write!(f, "TCP"),
            PrinterType::Usb => write!(f, "USB"),
            PrinterType::Win => write!(f, "WIN"),
            PrinterType::Serial => write!(f, "SERIAL"),
        }
    }
}

/// Ticket layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketType {
    /// Kitchen ticket (no prices)
    #[serde(alias = "cocina")]
    Cocina,
    /// Cashier ticket (prices and total)
    #[default]
    #[serde(alias = "caja")]
    Caja,
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TicketType::Cocina => write!(f, "COCINA"),
            TicketType::Caja => write!(f, "CAJA"),
        }
    }
}

/// Order timestamp as sent by the backend
///
/// Either an ISO-8601 string or the `[year, month, day, hour, minute, second]`
/// array produced by the backend's default `LocalDateTime` serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FechaHora {
    Text(String),
    Parts(Vec<i64>),
}

impl FechaHora {
    /// Resolve to a local wall-clock time, `None` when unparseable
    pub fn to_local(&self) -> Option<NaiveDateTime> {
        match self {
            FechaHora::Text(s) => {
                let s = s.trim();
                if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                    return Some(dt.with_timezone(&Local).naive_local());
                }
                s.parse::<NaiveDateTime>()
                    .ok()
                    .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
            }
            FechaHora::Parts(parts) => {
                if parts.len() < 3 {
                    return None;
                }
                let part = |i: usize| u32::try_from(parts.get(i).copied().unwrap_or(0)).ok();
                let year = i32::try_from(parts[0]).ok()?;
                NaiveDate::from_ymd_opt(year, part(1)?, part(2)?)?.and_hms_opt(
                    part(3)?,
                    part(4)?,
                    part(5)?,
                )
            }
        }
    }
}

/// One ordered line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketItem {
    #[serde(default)]
    pub nombre_producto: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_lenient_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub cantidad: Option<i64>,
    #[serde(
        default,
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "de_lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub precio_total: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notas: Option<String>,
}

impl TicketItem {
    /// Quantity, 0 when absent
    pub fn quantity(&self) -> i64 {
        self.cantidad.unwrap_or(0)
    }

    /// Line total, 0 when absent
    pub fn line_total(&self) -> Decimal {
        self.precio_total.unwrap_or(Decimal::ZERO)
    }

    /// Product name or a placeholder
    pub fn product_name(&self) -> &str {
        match self.nombre_producto.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Producto",
        }
    }

    /// Non-blank note
    pub fn note(&self) -> Option<&str> {
        self.notas
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Ticket payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketData {
    #[serde(default)]
    pub nombre_mesa: Option<String>,
    #[serde(default, deserialize_with = "de_opt_lenient_string")]
    pub comanda_id: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub fecha_hora: Option<FechaHora>,
    #[serde(default, deserialize_with = "de_null_as_default")]
    pub items: Vec<TicketItem>,
    #[serde(
        default,
        serialize_with = "rust_decimal::serde::float_option::serialize",
        deserialize_with = "de_lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<Decimal>,
    /// Preparation area; an area naming the kitchen forces the kitchen layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
}

impl TicketData {
    /// Check the payload invariant: table name and at least one item
    ///
    /// Pure: the verdict depends only on `self`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.nombre_mesa.as_deref().map(str::trim) {
            None | Some("") => return Err(ValidationError::MissingTableName),
            Some(_) => {}
        }
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }
        Ok(())
    }

    pub fn table_name(&self) -> &str {
        self.nombre_mesa.as_deref().unwrap_or("")
    }

    /// Order id or `N/A`
    pub fn comanda_label(&self) -> &str {
        match self.comanda_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => "N/A",
        }
    }

    /// Ticket total, 0 when absent
    pub fn total_amount(&self) -> Decimal {
        self.total.unwrap_or(Decimal::ZERO)
    }

    /// Order time, falling back to now
    pub fn timestamp(&self) -> NaiveDateTime {
        self.fecha_hora
            .as_ref()
            .and_then(FechaHora::to_local)
            .unwrap_or_else(|| Local::now().naive_local())
    }
}

/// A single ticket printing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub printer_type: PrinterType,
    #[serde(default)]
    pub printer_target: String,
    #[serde(default)]
    pub ticket_type: TicketType,
    #[serde(default)]
    pub ticket_data: TicketData,
    /// Custom layout configured in the POS; overrides the built-in layouts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TicketTemplate>,
}

impl PrintJob {
    /// Build a job without a custom template
    pub fn new(
        printer_type: PrinterType,
        printer_target: impl Into<String>,
        ticket_type: TicketType,
        ticket_data: TicketData,
    ) -> Self {
        Self {
            printer_type,
            printer_target: printer_target.into(),
            ticket_type,
            ticket_data,
            template: None,
        }
    }

    /// Attach a custom template
    pub fn with_template(mut self, template: TicketTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Validate target and ticket payload
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.printer_target.trim().is_empty() {
            return Err(ValidationError::MissingPrinterTarget);
        }
        self.ticket_data.validate()
    }

    /// Layout to print: a kitchen area overrides the declared ticket type
    pub fn resolved_ticket_type(&self) -> TicketType {
        match self.ticket_data.area.as_deref() {
            Some(area) if area.to_uppercase().contains("COCINA") => TicketType::Cocina,
            _ => self.ticket_type,
        }
    }

    /// Custom template, if it carries any block
    pub fn usable_template(&self) -> Option<&TicketTemplate> {
        self.template.as_ref().filter(|t| !t.blocks.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn item(name: &str, qty: i64) -> TicketItem {
        TicketItem {
            nombre_producto: Some(name.to_string()),
            cantidad: Some(qty),
            ..Default::default()
        }
    }

    fn data(mesa: Option<&str>, items: Vec<TicketItem>) -> TicketData {
        TicketData {
            nombre_mesa: mesa.map(str::to_string),
            items,
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_requires_table_name() {
        assert_eq!(
            data(None, vec![item("Burger", 1)]).validate(),
            Err(ValidationError::MissingTableName)
        );
        assert_eq!(
            data(Some("  "), vec![item("Burger", 1)]).validate(),
            Err(ValidationError::MissingTableName)
        );
    }

    #[test]
    fn test_validate_requires_items() {
        assert_eq!(
            data(Some("Mesa 1"), vec![]).validate(),
            Err(ValidationError::NoItems)
        );
    }

    #[test]
    fn test_validate_is_idempotent() {
        let ok = data(Some("Mesa 1"), vec![item("Burger", 2)]);
        let bad = data(Some("Mesa 1"), vec![]);
        assert_eq!(ok.validate(), ok.validate());
        assert_eq!(bad.validate(), bad.validate());
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_job_requires_target() {
        let job = PrintJob::new(
            PrinterType::Tcp,
            " ",
            TicketType::Caja,
            data(Some("Mesa 1"), vec![item("Burger", 1)]),
        );
        assert_eq!(job.validate(), Err(ValidationError::MissingPrinterTarget));
    }

    #[test]
    fn test_missing_numbers_default_to_zero() {
        let item: TicketItem = serde_json::from_str(r#"{"nombreProducto":"Agua"}"#).unwrap();
        assert_eq!(item.quantity(), 0);
        assert_eq!(item.line_total(), Decimal::ZERO);

        let data: TicketData = serde_json::from_str(r#"{"nombreMesa":"1","total":null}"#).unwrap();
        assert_eq!(data.total_amount(), Decimal::ZERO);
    }

    #[test]
    fn test_kitchen_area_overrides_ticket_type() {
        let mut job = PrintJob::new(
            PrinterType::Tcp,
            "10.0.0.2:9100",
            TicketType::Caja,
            data(Some("Mesa 1"), vec![item("Burger", 1)]),
        );
        assert_eq!(job.resolved_ticket_type(), TicketType::Caja);

        job.ticket_data.area = Some("Cocina caliente".to_string());
        assert_eq!(job.resolved_ticket_type(), TicketType::Cocina);
    }

    #[test]
    fn test_fecha_hora_array() {
        let f = FechaHora::Parts(vec![2024, 5, 17, 13, 45, 10]);
        let dt = f.to_local().unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 5, 17));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (13, 45, 10));

        assert!(FechaHora::Parts(vec![2024, 13, 1]).to_local().is_none());
    }

    #[test]
    fn test_fecha_hora_text() {
        let f = FechaHora::Text("2024-05-17T13:45:10".to_string());
        assert_eq!(f.to_local().unwrap().minute(), 45);

        let f = FechaHora::Text("2024-05-17T13:45:10.123456".to_string());
        assert_eq!(f.to_local().unwrap().second(), 10);

        assert!(FechaHora::Text("ayer".to_string()).to_local().is_none());
    }

    #[test]
    fn test_unknown_printer_type_rejected() {
        let result: Result<PrintJob, _> =
            serde_json::from_str(r#"{"printerType":"FAX","printerTarget":"x"}"#);
        assert!(result.is_err());
    }
}
