//! Built-in ticket layouts
//!
//! Renders ticket data into printer directives. Kitchen tickets carry no
//! prices; cashier tickets carry per-line totals and the ticket total.

use chrono::NaiveDateTime;
use puente_printer::{Align, Directive, TextSize, pad_chars, truncate_chars};
use shared::{PrintJob, TicketData, TicketType};

use super::money;
use super::template::render_template;
use crate::core::PrintingConfig;

/// Product name limit on kitchen tickets
const KITCHEN_NAME_WIDTH: usize = 25;
/// Product name column on cashier tickets
const CASHIER_NAME_WIDTH: usize = 20;
/// Cashier line-total column
const CASHIER_TOTAL_WIDTH: usize = 8;

/// Kitchen and cashier ticket renderer
#[derive(Debug, Clone)]
pub struct TicketRenderer {
    width: usize,
    business_name: String,
}

impl TicketRenderer {
    pub fn new(config: &PrintingConfig) -> Self {
        Self {
            width: config.paper_width,
            business_name: config.business_name.clone(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Render a job: its custom template if any, else the built-in layout
    pub fn render_job(&self, job: &PrintJob) -> Vec<Directive> {
        let now = chrono::Local::now().naive_local();
        match job.usable_template() {
            Some(template) => {
                tracing::debug!(template = ?template.name, "Rendering custom template");
                render_template(template, &job.ticket_data, self.width, now)
            }
            None => self.render(&job.ticket_data, job.resolved_ticket_type()),
        }
    }

    /// Render with the ticket's own time (or now when it has none)
    pub fn render(&self, data: &TicketData, kind: TicketType) -> Vec<Directive> {
        self.render_at(data, kind, data.timestamp())
    }

    /// Render with an explicit timestamp
    pub fn render_at(
        &self,
        data: &TicketData,
        kind: TicketType,
        at: NaiveDateTime,
    ) -> Vec<Directive> {
        match kind {
            TicketType::Cocina => self.kitchen(data, at),
            TicketType::Caja => self.cashier(data, at),
        }
    }

    fn kitchen(&self, data: &TicketData, at: NaiveDateTime) -> Vec<Directive> {
        let mut out = vec![
            Directive::Align(Align::Center),
            Directive::Size(TextSize::Double),
            Directive::line("COCINA"),
            Directive::Size(TextSize::Normal),
            Directive::separator('=', self.width),
            Directive::Align(Align::Left),
        ];

        out.push(Directive::line(format!("Mesa: {}", data.table_name())));
        out.push(Directive::line(format!("Comanda: {}", data.comanda_label())));
        out.push(Directive::line(format!("Hora: {}", at.format("%H:%M:%S"))));
        out.push(Directive::separator('-', self.width));

        out.push(Directive::line("Cant. | Producto"));
        out.push(Directive::separator('-', self.width));

        for item in &data.items {
            let name = truncate_chars(item.product_name(), KITCHEN_NAME_WIDTH);
            out.push(Directive::line(format!("{:>3} x {}", item.quantity(), name)));
            if let Some(note) = item.note() {
                out.push(Directive::line(format!("     Nota: {}", note)));
            }
        }

        out.push(Directive::separator('-', self.width));
        out.push(Directive::Align(Align::Center));
        out.push(Directive::Bold(true));
        out.push(Directive::line("¡LISTO PARA PREPARAR!"));
        out.push(Directive::Bold(false));
        out.push(Directive::line(""));
        out.push(Directive::Cut);
        out
    }

    fn cashier(&self, data: &TicketData, at: NaiveDateTime) -> Vec<Directive> {
        let mut out = vec![
            Directive::Align(Align::Center),
            Directive::Bold(true),
            Directive::line(self.business_name.clone()),
            Directive::Bold(false),
            Directive::line("TICKET DE CAJA"),
            Directive::separator('=', self.width),
            Directive::Align(Align::Left),
        ];

        out.push(Directive::line(format!("Mesa: {}", data.table_name())));
        out.push(Directive::line(format!("Comanda: {}", data.comanda_label())));
        out.push(Directive::line(format!(
            "Fecha: {}",
            at.format("%d/%m/%Y %H:%M:%S")
        )));
        out.push(Directive::separator('-', self.width));

        out.push(Directive::line("Cant. | Producto | Total"));
        out.push(Directive::separator('-', self.width));

        for item in &data.items {
            let name = pad_chars(item.product_name(), CASHIER_NAME_WIDTH, false);
            out.push(Directive::line(format!(
                "{:>3} | {} | {:>width$}",
                item.quantity(),
                name,
                money(item.line_total()),
                width = CASHIER_TOTAL_WIDTH
            )));
        }

        out.push(Directive::separator('-', self.width));
        out.push(Directive::Align(Align::Right));
        out.push(Directive::line(format!(
            "TOTAL: {}",
            money(data.total_amount())
        )));
        out.push(Directive::Align(Align::Center));
        out.push(Directive::line("¡Gracias por su visita!"));
        out.push(Directive::line(""));
        out.push(Directive::Cut);
        out
    }
}

impl Default for TicketRenderer {
    fn default() -> Self {
        Self::new(&PrintingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use puente_printer::to_plain_text;
    use rust_decimal::Decimal;
    use shared::{FechaHora, TicketItem};

    fn item(name: &str, qty: i64, total: Option<Decimal>) -> TicketItem {
        TicketItem {
            nombre_producto: Some(name.to_string()),
            cantidad: Some(qty),
            precio_total: total,
            notas: None,
        }
    }

    fn ticket(items: Vec<TicketItem>, total: Option<Decimal>) -> TicketData {
        TicketData {
            nombre_mesa: Some("Mesa 4".into()),
            comanda_id: Some("118".into()),
            fecha_hora: Some(FechaHora::Parts(vec![2024, 5, 17, 13, 45, 10])),
            items,
            total,
            area: None,
        }
    }

    fn lines(directives: &[Directive]) -> Vec<String> {
        to_plain_text(directives)
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_kitchen_ticket_has_no_prices() {
        let data = ticket(vec![item("Burger", 2, Some(Decimal::new(2000, 2)))], None);
        let out = lines(&TicketRenderer::default().render(&data, TicketType::Cocina));

        assert_eq!(out[0], "COCINA");
        assert!(out.contains(&"Mesa: Mesa 4".to_string()));
        assert!(out.contains(&"Comanda: 118".to_string()));
        assert!(out.contains(&"Hora: 13:45:10".to_string()));
        assert!(out.contains(&"  2 x Burger".to_string()));
        assert!(out.contains(&"¡LISTO PARA PREPARAR!".to_string()));
        assert!(out.iter().all(|l| !l.contains('$')));
    }

    #[test]
    fn test_kitchen_notes_and_truncation() {
        let mut long = item("Hamburguesa doble con queso cheddar", 1, None);
        long.notas = Some("  sin cebolla ".into());
        let data = ticket(vec![long], None);
        let out = lines(&TicketRenderer::default().render(&data, TicketType::Cocina));

        assert!(out.contains(&"  1 x Hamburguesa doble con que".to_string()));
        assert!(out.contains(&"     Nota: sin cebolla".to_string()));
    }

    #[test]
    fn test_cashier_lines_and_total() {
        let data = ticket(
            vec![item("Burger", 2, Some(Decimal::new(2000, 2)))],
            Some(Decimal::new(20, 0)),
        );
        let directives = TicketRenderer::default().render(&data, TicketType::Caja);
        let out = lines(&directives);

        assert_eq!(out[0], "Restaurante 'El Buen Sabor'");
        assert_eq!(out[1], "TICKET DE CAJA");
        assert!(out.contains(&"Fecha: 17/05/2024 13:45:10".to_string()));
        let line = out.iter().find(|l| l.contains("Burger")).unwrap();
        assert_eq!(*line, format!("  2 | {:<20} |   $20.00", "Burger"));
        assert!(line.ends_with("$20.00"));
        assert!(out.contains(&"TOTAL: $20.00".to_string()));
        assert_eq!(directives.last(), Some(&Directive::Cut));
    }

    #[test]
    fn test_missing_amounts_render_as_zero() {
        let mut bare = item("Agua", 1, None);
        bare.cantidad = None;
        let data = ticket(vec![bare], None);
        let out = lines(&TicketRenderer::default().render(&data, TicketType::Caja));

        let line = out.iter().find(|l| l.contains("Agua")).unwrap();
        assert!(line.starts_with("  0 | "));
        assert!(line.ends_with("$0.00"));
        assert!(out.contains(&"TOTAL: $0.00".to_string()));
    }

    #[test]
    fn test_cashier_name_truncated_to_column() {
        let data = ticket(
            vec![item("Ensalada mediterránea grande", 1, Some(Decimal::new(95, 1)))],
            None,
        );
        let out = lines(&TicketRenderer::default().render(&data, TicketType::Caja));
        assert!(out.contains(&"  1 | Ensalada mediterráne |    $9.50".to_string()));
    }

    #[test]
    fn test_missing_comanda_is_na() {
        let mut data = ticket(vec![item("Café", 1, None)], None);
        data.comanda_id = None;
        let out = lines(&TicketRenderer::default().render(&data, TicketType::Cocina));
        assert!(out.contains(&"Comanda: N/A".to_string()));
    }

    #[test]
    fn test_kitchen_area_overrides_ticket_type() {
        let mut data = ticket(vec![item("Burger", 1, Some(Decimal::ONE))], None);
        data.area = Some("Cocina caliente".into());
        let job = PrintJob::new(shared::PrinterType::Tcp, "10.0.0.5", TicketType::Caja, data);

        let out = lines(&TicketRenderer::default().render_job(&job));
        assert_eq!(out[0], "COCINA");
    }
}
