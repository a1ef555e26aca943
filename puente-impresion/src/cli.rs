//! Command line interface

use clap::{Parser, Subcommand};
use shared::{PrinterType, TicketType};

#[derive(Parser, Debug)]
#[command(
    name = "puente-impresion",
    version,
    about = "Relays POS print jobs from the broker to local thermal printers."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Connect to the broker and print incoming jobs (default)
    Run,
    /// List locally attached printers
    List,
    /// Print a sample ticket straight to a printer
    TestPrint {
        /// TCP, USB, WIN or SERIAL
        #[arg(long, value_parser = parse_printer_type)]
        printer_type: PrinterType,
        /// Address, device path, driver name or `port@baud`
        #[arg(long)]
        target: String,
        /// COCINA or CAJA
        #[arg(long, value_parser = parse_ticket_type, default_value = "CAJA")]
        ticket: TicketType,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

/// Same spellings as the job payload
fn parse_printer_type(s: &str) -> Result<PrinterType, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_uppercase()))
        .map_err(|_| format!("unknown printer type '{}' (TCP, USB, WIN, SERIAL)", s))
}

fn parse_ticket_type(s: &str) -> Result<TicketType, String> {
    serde_json::from_value(serde_json::Value::String(s.trim().to_uppercase()))
        .map_err(|_| format!("unknown ticket type '{}' (COCINA, CAJA)", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["puente-impresion"]).unwrap();
        assert_eq!(cli.command(), Command::Run);
    }

    #[test]
    fn test_parse_test_print() {
        let cli = Cli::try_parse_from([
            "puente-impresion",
            "test-print",
            "--printer-type",
            "serial",
            "--target",
            "/dev/ttyUSB0@19200",
            "--ticket",
            "cocina",
        ])
        .unwrap();

        assert_eq!(
            cli.command(),
            Command::TestPrint {
                printer_type: PrinterType::Serial,
                target: "/dev/ttyUSB0@19200".into(),
                ticket: TicketType::Cocina,
            }
        );
    }

    #[test]
    fn test_rejects_unknown_printer_type() {
        let result = Cli::try_parse_from([
            "puente-impresion",
            "test-print",
            "--printer-type",
            "fax",
            "--target",
            "x",
        ]);
        assert!(result.is_err());
    }
}
