use anyhow::Context;
use clap::Parser;
use puente_impresion::cli::{Cli, Command};
use puente_impresion::core::{print_sample, shutdown_signal};
use puente_impresion::{
    Bridge, Config, DeviceFactory, PrintingConfig, init_logger, init_logger_with_file,
    print_banner,
};
use shared::{PrinterType, TicketType};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    match cli.command() {
        Command::Run => run().await,
        Command::List => list(),
        Command::TestPrint {
            printer_type,
            target,
            ticket,
        } => test_print(printer_type, &target, ticket).await,
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("Invalid configuration")?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    print_banner();

    tracing::info!(environment = ?config.environment, "Puente de Impresión starting...");

    Bridge::start(&config).run(shutdown_signal()).await;
    Ok(())
}

fn list() -> anyhow::Result<()> {
    let printers = puente_printer::list_printers().context("Printer discovery failed")?;
    if printers.is_empty() {
        println!("No printers found");
    }
    for name in printers {
        println!("{}", name);
    }
    Ok(())
}

async fn test_print(kind: PrinterType, target: &str, ticket: TicketType) -> anyhow::Result<()> {
    init_logger();

    let printing = PrintingConfig::from_env()?;
    let printer = print_sample(&printing, &DeviceFactory::new(), kind, target, ticket)
        .await
        .with_context(|| format!("Test print to {} {} failed", kind, target))?;

    println!("Test ticket sent to {}", printer);
    Ok(())
}
