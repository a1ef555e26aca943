//! Broker destinations and job (de)serialization
//!
//! Both the dispatch client and the bridge speak the same contract: the
//! client SENDs the JSON job to [`JOB_SUBMIT_DESTINATION`], the backend fans
//! it out on [`JOB_TOPIC`], where the bridge is subscribed.

use crate::models::PrintJob;

/// Application destination jobs are published to
pub const JOB_SUBMIT_DESTINATION: &str = "/app/print";

/// Topic the bridge subscribes to
pub const JOB_TOPIC: &str = "/topic/print-jobs";

/// Content type header value for job bodies
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Serialize a job into the wire body
pub fn encode_job(job: &PrintJob) -> serde_json::Result<String> {
    serde_json::to_string(job)
}

/// Parse a wire body into a job
pub fn decode_job(body: &str) -> serde_json::Result<PrintJob> {
    serde_json::from_str(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PrinterType, TicketType};
    use rust_decimal::Decimal;

    #[test]
    fn test_decode_backend_payload() {
        let body = r#"{
            "printerType": "TCP",
            "printerTarget": "192.168.1.50:9100",
            "ticketType": "COCINA",
            "ticketData": {
                "nombreMesa": "Mesa 4",
                "comandaId": 118,
                "fechaHora": [2024, 5, 17, 13, 45, 10],
                "items": [
                    {"nombreProducto": "Milanesa", "cantidad": 2, "precioTotal": 31.5, "notas": "sin sal"}
                ],
                "total": 31.5
            }
        }"#;

        let job = decode_job(body).unwrap();
        assert_eq!(job.printer_type, PrinterType::Tcp);
        assert_eq!(job.ticket_type, TicketType::Cocina);
        assert_eq!(job.ticket_data.comanda_id.as_deref(), Some("118"));
        assert_eq!(job.ticket_data.items[0].quantity(), 2);
        assert!(job.template.is_none());
    }

    #[test]
    fn test_malformed_item_fields_do_not_drop_the_ticket() {
        let body = r#"{
            "printerType": "TCP",
            "printerTarget": "192.168.1.50:9100",
            "ticketType": "CAJA",
            "ticketData": {
                "nombreMesa": "Mesa 4",
                "fechaHora": 1715950000000,
                "items": [
                    {"nombreProducto": "Milanesa", "cantidad": 2, "precioTotal": 31.5},
                    {"nombreProducto": "Agua", "cantidad": "1", "precioTotal": "n/a"},
                    {"nombreProducto": "Flan", "cantidad": 1.0, "precioTotal": "4.25"}
                ],
                "total": "35.75"
            }
        }"#;

        let job = decode_job(body).unwrap();
        let data = &job.ticket_data;
        assert!(data.fecha_hora.is_none());
        assert_eq!(data.items.len(), 3);
        assert_eq!(data.items[1].quantity(), 1);
        assert_eq!(data.items[1].line_total(), Decimal::ZERO);
        assert_eq!(data.items[2].quantity(), 1);
        assert_eq!(data.items[2].line_total(), Decimal::new(425, 2));
        assert_eq!(data.total_amount(), Decimal::new(3575, 2));
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_encoded_body_uses_camel_case() {
        let job = decode_job(
            r#"{"printerType":"USB","printerTarget":"/dev/usb/lp0","ticketType":"CAJA",
                "ticketData":{"nombreMesa":"Barra","items":[{"nombreProducto":"Cafe","cantidad":1,"precioTotal":2.5}],"total":2.5}}"#,
        )
        .unwrap();

        let body = encode_job(&job).unwrap();
        assert!(body.contains("\"printerTarget\":\"/dev/usb/lp0\""));
        assert!(body.contains("\"nombreMesa\":\"Barra\""));
        assert!(body.contains("\"precioTotal\":2.5"));
    }
}
