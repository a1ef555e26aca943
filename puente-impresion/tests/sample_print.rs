//! `test-print` path: sample ticket straight to a printer

mod common;

use common::{Behavior, FakeFactory};
use puente_impresion::core::print_sample;
use puente_impresion::{BridgeError, PrintingConfig};
use puente_printer::PrintError;
use shared::{PrinterType, TicketType};

#[tokio::test]
async fn test_sample_ticket_reaches_printer() {
    let (factory, _started) = FakeFactory::new(Behavior::Accept);

    let printer = print_sample(
        &PrintingConfig::default(),
        &*factory,
        PrinterType::Usb,
        "/dev/usb/lp0",
        TicketType::Caja,
    )
    .await
    .unwrap();

    assert_eq!(printer, "fake:/dev/usb/lp0");
    let printed = factory.printed();
    assert_eq!(printed.len(), 1);
    assert!(printed[0].1.contains("TICKET DE CAJA"));
    assert!(printed[0].1.contains("TOTAL: $6.10"));
}

#[tokio::test]
async fn test_sample_print_failure_is_reported() {
    let (factory, _started) = FakeFactory::new(Behavior::Refuse);

    let result = print_sample(
        &PrintingConfig::default(),
        &*factory,
        PrinterType::Tcp,
        "10.0.0.5",
        TicketType::Cocina,
    )
    .await;

    assert!(matches!(
        result,
        Err(BridgeError::Printer(PrintError::Connection(_)))
    ));
}
