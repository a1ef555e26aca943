//! Bridge: broker job topic → print executor
//!
//! Messages arrive in broker order and are handed to the executor one by
//! one. A message that arrives while a job is printing is dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use puente_client::{
    BrokerLink, BrokerTransport, InboundMessage, LinkHandle, LinkPolicy, Notifier, Severity,
    StompWsTransport, TracingNotifier, TransportEvent,
};
use puente_printer::Printer;
use rust_decimal::Decimal;
use shared::message::decode_job;
use shared::{FechaHora, PrinterType, TicketData, TicketItem, TicketType};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::config::{Config, PrintingConfig};
use super::error::BridgeResult;
use crate::printing::{
    DeviceFactory, JobError, JobHandle, PrintExecutor, PrinterFactory, TicketRenderer,
};

/// Delay before reconnecting when a failed job finds the link down
const RECOVERY_DELAY: Duration = Duration::from_secs(2);

/// Running bridge
pub struct Bridge {
    link: LinkHandle,
    jobs: mpsc::Receiver<InboundMessage>,
    executor: PrintExecutor,
    notifier: Arc<dyn Notifier>,
}

impl Bridge {
    /// Connect to the configured broker and drive real printers
    pub fn start(config: &Config) -> Self {
        let (transport, events) = StompWsTransport::new(&config.websocket_url, config.stomp());
        let executor = PrintExecutor::new(
            Arc::new(DeviceFactory::new()),
            TicketRenderer::new(&config.printing),
        );

        info!(
            url = %config.websocket_url,
            topic = %config.job_topic,
            environment = ?config.environment,
            "Starting print bridge"
        );

        Self::with_parts(
            Arc::new(transport),
            events,
            config.link_policy(),
            &config.job_topic,
            executor,
            Arc::new(TracingNotifier),
        )
    }

    /// Assemble from explicit parts
    pub fn with_parts(
        transport: Arc<dyn BrokerTransport>,
        events: mpsc::Receiver<TransportEvent>,
        policy: LinkPolicy,
        topic: &str,
        executor: PrintExecutor,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (link, jobs) =
            BrokerLink::new(transport, events, policy, notifier.clone()).subscribe_to(topic);
        let link = link.with_last_activity(executor.last_print()).spawn();

        Self {
            link,
            jobs,
            executor,
            notifier,
        }
    }

    pub fn link(&self) -> &LinkHandle {
        &self.link
    }

    pub fn executor(&self) -> &PrintExecutor {
        &self.executor
    }

    /// Process jobs until `shutdown` resolves, then stop
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                message = self.jobs.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => {
                        warn!("Job channel closed");
                        break;
                    }
                },
            }
        }

        self.stop().await;
    }

    fn handle_message(&self, message: InboundMessage) {
        let job = match decode_job(&message.body) {
            Ok(job) => job,
            Err(e) => {
                error!(destination = %message.destination, error = %e, "Discarding undecodable print job");
                return;
            }
        };

        match self.executor.submit(job) {
            Ok(handle) => {
                debug!(job_id = handle.id(), "Print job accepted");
                tokio::spawn(watch_outcome(
                    handle,
                    self.link.clone(),
                    self.notifier.clone(),
                ));
            }
            Err(JobError::Busy { current }) => {
                warn!(current_job = current, "Printer busy, dropping print job");
                self.notifier.notify(
                    Severity::Warning,
                    "Impresora ocupada",
                    &format!("Se descartó un ticket mientras se imprimía el trabajo #{current}"),
                );
            }
            Err(e) => {
                error!(error = %e, "Print job rejected");
                self.notifier
                    .notify(Severity::Error, "Error de impresión", &e.to_string());
            }
        }
    }

    async fn stop(self) {
        info!("Shutting down print bridge");
        self.link.begin_shutdown();
        if let Some(id) = self.executor.abort_current() {
            info!(job_id = id, "Abandoned in-flight job on shutdown");
        }
        self.link.shutdown().await;
        info!("Print bridge stopped");
    }
}

async fn watch_outcome(handle: JobHandle, link: LinkHandle, notifier: Arc<dyn Notifier>) {
    let id = handle.id();
    let error = match handle.outcome().await {
        Ok(report) => {
            debug!(job_id = id, printer = %report.printer, "Print job reported");
            notifier.notify(
                Severity::Success,
                "Impresión completada",
                &format!("Ticket impreso en {}", report.printer),
            );
            return;
        }
        Err(JobError::Aborted) if link.is_shutting_down() => return,
        Err(e) => e,
    };

    debug!(job_id = id, error = %error, "Print job finished with error");
    notifier.notify(Severity::Error, "Error de impresión", &error.to_string());

    if error.is_connection_failure() && !link.is_connected() && !link.is_shutting_down() {
        warn!(job_id = id, error = %error, "Print failed while broker link is down, scheduling reconnect");
        link.reconnect_after(RECOVERY_DELAY);
    }
}

/// Print a sample ticket straight to a printer, bypassing the broker
///
/// Returns the adapter description.
pub async fn print_sample(
    printing: &PrintingConfig,
    factory: &dyn PrinterFactory,
    kind: PrinterType,
    target: &str,
    ticket: TicketType,
) -> BridgeResult<String> {
    let printer = factory.open(kind, target)?;
    let directives = TicketRenderer::new(printing).render(&sample_ticket(), ticket);
    printer.execute(&directives).await?;
    info!(printer = %printer.describe(), ticket_type = %ticket, "Sample ticket printed");
    Ok(printer.describe())
}

fn sample_ticket() -> TicketData {
    TicketData {
        nombre_mesa: Some("Prueba".into()),
        comanda_id: Some("0".into()),
        fecha_hora: Some(FechaHora::Text(
            Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
        )),
        items: vec![
            TicketItem {
                nombre_producto: Some("Café con leche".into()),
                cantidad: Some(2),
                precio_total: Some(Decimal::new(360, 2)),
                notas: Some("Sin azúcar".into()),
            },
            TicketItem {
                nombre_producto: Some("Tostada".into()),
                cantidad: Some(1),
                precio_total: Some(Decimal::new(250, 2)),
                notas: None,
            },
        ],
        total: Some(Decimal::new(610, 2)),
        area: None,
    }
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
