//! Print job executor
//!
//! Runs at most one job at a time. A job is admitted, validated, rendered and
//! sent to its printer under a single deadline. Jobs arriving while another
//! is in flight are rejected, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use puente_client::LastActivity;
use puente_printer::PrintError;
use shared::{PrintJob, TicketType, ValidationError};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::factory::PrinterFactory;
use super::renderer::TicketRenderer;

/// Deadline for rendering plus the device call
pub const PRINT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Printer busy with job #{current}")]
    Busy { current: u64 },

    #[error("Invalid ticket: {0}")]
    Validation(#[from] ValidationError),

    #[error("Print timed out after {0:?}")]
    Timeout(Duration),

    #[error("Printer error: {0}")]
    Printer(#[from] PrintError),

    #[error("Print job aborted")]
    Aborted,
}

impl JobError {
    /// Failures that point at an unreachable device
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            JobError::Timeout(_)
                | JobError::Printer(
                    PrintError::Connection(_)
                        | PrintError::Offline(_)
                        | PrintError::Timeout(_)
                        | PrintError::Io(_)
                )
        )
    }
}

/// Successful job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub id: u64,
    /// Adapter description (`tcp:10.0.0.5:9100`)
    pub printer: String,
    pub ticket_type: TicketType,
    pub elapsed: Duration,
}

/// Outcome of a submitted job
#[derive(Debug)]
pub struct JobHandle {
    id: u64,
    outcome: oneshot::Receiver<Result<JobReport, JobError>>,
}

impl JobHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the job to finish; an aborted job reports [`JobError::Aborted`]
    pub async fn outcome(self) -> Result<JobReport, JobError> {
        self.outcome.await.unwrap_or(Err(JobError::Aborted))
    }
}

struct InFlight {
    id: u64,
    task: Option<AbortHandle>,
}

/// At-most-one print job executor
#[derive(Clone)]
pub struct PrintExecutor {
    factory: Arc<dyn PrinterFactory>,
    renderer: Arc<TicketRenderer>,
    timeout: Duration,
    current: Arc<Mutex<Option<InFlight>>>,
    next_id: Arc<AtomicU64>,
    last_print: LastActivity,
}

impl PrintExecutor {
    pub fn new(factory: Arc<dyn PrinterFactory>, renderer: TicketRenderer) -> Self {
        Self {
            factory,
            renderer: Arc::new(renderer),
            timeout: PRINT_TIMEOUT,
            current: Arc::new(Mutex::new(None)),
            next_id: Arc::new(AtomicU64::new(0)),
            last_print: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Admit a job and start it in the background
    ///
    /// Fails with [`JobError::Busy`] while another job is in flight.
    pub fn submit(&self, job: PrintJob) -> Result<JobHandle, JobError> {
        let id = {
            let mut current = self.current.lock();
            if let Some(busy) = current.as_ref() {
                return Err(JobError::Busy { current: busy.id });
            }
            let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
            *current = Some(InFlight { id, task: None });
            id
        };

        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        let task = tokio::spawn(async move {
            let outcome = this.run(id, job).await;
            this.finish(id);
            let _ = tx.send(outcome);
        });

        if let Some(in_flight) = self.current.lock().as_mut().filter(|f| f.id == id) {
            in_flight.task = Some(task.abort_handle());
        }

        Ok(JobHandle { id, outcome: rx })
    }

    async fn run(&self, id: u64, job: PrintJob) -> Result<JobReport, JobError> {
        if let Err(e) = job.validate() {
            warn!(job_id = id, error = %e, "Rejected invalid print job");
            return Err(e.into());
        }

        let ticket_type = job.resolved_ticket_type();
        info!(
            job_id = id,
            printer_type = %job.printer_type,
            target = %job.printer_target,
            ticket_type = %ticket_type,
            "Printing job"
        );

        let started = Instant::now();
        let factory = self.factory.clone();
        let renderer = self.renderer.clone();
        let device = tokio::spawn(async move {
            let directives = renderer.render_job(&job);
            let printer = factory.open(job.printer_type, &job.printer_target)?;
            printer.execute(&directives).await?;
            Ok::<_, PrintError>(printer.describe())
        });

        match tokio::time::timeout(self.timeout, device).await {
            Err(_) => {
                error!(job_id = id, timeout = ?self.timeout, "Print job timed out, abandoning");
                Err(JobError::Timeout(self.timeout))
            }
            Ok(Err(join)) => {
                error!(job_id = id, error = %join, "Print task failed");
                Err(JobError::Aborted)
            }
            Ok(Ok(Err(e))) => {
                error!(job_id = id, error = %e, "Print job failed");
                Err(e.into())
            }
            Ok(Ok(Ok(printer))) => {
                let elapsed = started.elapsed();
                *self.last_print.lock() = Some(Local::now());
                info!(job_id = id, printer = %printer, elapsed_ms = elapsed.as_millis() as u64, "Print job completed");
                Ok(JobReport {
                    id,
                    printer,
                    ticket_type,
                    elapsed,
                })
            }
        }
    }

    /// Clear the slot if it still holds job `id`
    fn finish(&self, id: u64) {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|f| f.id == id) {
            *current = None;
        }
    }

    /// Abandon the in-flight job, if any
    pub fn abort_current(&self) -> Option<u64> {
        let in_flight = self.current.lock().take()?;
        if let Some(task) = in_flight.task {
            task.abort();
        }
        warn!(job_id = in_flight.id, "Aborted in-flight print job");
        Some(in_flight.id)
    }

    pub fn is_idle(&self) -> bool {
        self.current.lock().is_none()
    }

    /// Id of the in-flight job
    pub fn current_job(&self) -> Option<u64> {
        self.current.lock().as_ref().map(|f| f.id)
    }

    /// Shared record of the last successful print
    pub fn last_print(&self) -> LastActivity {
        self.last_print.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use puente_printer::{PrintResult, Printer};
    use rust_decimal::Decimal;
    use shared::{PrinterType, TicketData, TicketItem};
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Copy)]
    enum Behavior {
        Accept,
        Refuse,
        Hang,
    }

    struct FakePrinter {
        behavior: Behavior,
        printed: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    #[async_trait]
    impl Printer for FakePrinter {
        async fn print(&self, data: &[u8]) -> PrintResult<()> {
            match self.behavior {
                Behavior::Accept => {
                    self.printed.lock().push(data.to_vec());
                    Ok(())
                }
                Behavior::Refuse => Err(PrintError::Connection("refused".into())),
                Behavior::Hang => std::future::pending().await,
            }
        }

        async fn is_online(&self) -> bool {
            true
        }

        fn describe(&self) -> String {
            "fake:counter".into()
        }
    }

    struct FakeFactory {
        behavior: Behavior,
        opens: AtomicUsize,
        printed: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl FakeFactory {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                opens: AtomicUsize::new(0),
                printed: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    impl PrinterFactory for FakeFactory {
        fn open(&self, _: PrinterType, _: &str) -> PrintResult<Box<dyn Printer>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakePrinter {
                behavior: self.behavior,
                printed: self.printed.clone(),
            }))
        }
    }

    fn job(items: usize) -> PrintJob {
        let data = TicketData {
            nombre_mesa: Some("Mesa 3".into()),
            items: (0..items)
                .map(|_| TicketItem {
                    nombre_producto: Some("Burger".into()),
                    cantidad: Some(2),
                    precio_total: Some(Decimal::new(2000, 2)),
                    notas: None,
                })
                .collect(),
            ..Default::default()
        };
        PrintJob::new(PrinterType::Tcp, "10.0.0.9:9100", TicketType::Cocina, data)
    }

    fn executor(factory: &Arc<FakeFactory>) -> PrintExecutor {
        PrintExecutor::new(factory.clone(), TicketRenderer::default())
    }

    #[tokio::test]
    async fn test_successful_job() {
        let factory = FakeFactory::new(Behavior::Accept);
        let executor = executor(&factory);

        let report = executor.submit(job(1)).unwrap().outcome().await.unwrap();
        assert_eq!(report.id, 1);
        assert_eq!(report.printer, "fake:counter");
        assert_eq!(report.ticket_type, TicketType::Cocina);
        assert!(executor.is_idle());
        assert!(executor.last_print().lock().is_some());

        let printed = factory.printed.lock();
        assert_eq!(printed.len(), 1);
        let text = String::from_utf8_lossy(&printed[0]);
        assert!(text.contains("  2 x Burger"));
    }

    #[tokio::test]
    async fn test_invalid_job_never_touches_printer() {
        let factory = FakeFactory::new(Behavior::Accept);
        let executor = executor(&factory);

        let outcome = executor.submit(job(0)).unwrap().outcome().await;
        assert!(matches!(
            outcome,
            Err(JobError::Validation(ValidationError::NoItems))
        ));
        assert_eq!(factory.opens.load(Ordering::SeqCst), 0);
        assert!(executor.is_idle());
        assert!(executor.last_print().lock().is_none());
    }

    #[tokio::test]
    async fn test_second_job_is_busy() {
        let factory = FakeFactory::new(Behavior::Hang);
        let executor = executor(&factory);

        let first = executor.submit(job(1)).unwrap();
        let second = executor.submit(job(1));
        assert!(matches!(second, Err(JobError::Busy { current }) if current == first.id()));
        assert_eq!(executor.current_job(), Some(first.id()));

        assert_eq!(executor.abort_current(), Some(first.id()));
        assert!(matches!(first.outcome().await, Err(JobError::Aborted)));
        assert!(executor.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_printer_times_out_and_frees_slot() {
        let factory = FakeFactory::new(Behavior::Hang);
        let executor = executor(&factory);

        let started = Instant::now();
        let outcome = executor.submit(job(1)).unwrap().outcome().await;
        let elapsed = started.elapsed();

        assert!(matches!(outcome, Err(JobError::Timeout(t)) if t == PRINT_TIMEOUT));
        assert!(elapsed >= PRINT_TIMEOUT);
        assert!(elapsed < PRINT_TIMEOUT + Duration::from_secs(1));
        assert!(executor.is_idle());
        assert!(executor.submit(job(1)).is_ok());
    }

    #[tokio::test]
    async fn test_printer_failure_is_not_retried() {
        let factory = FakeFactory::new(Behavior::Refuse);
        let executor = executor(&factory);

        let outcome = executor.submit(job(1)).unwrap().outcome().await;
        let err = outcome.unwrap_err();
        assert!(matches!(err, JobError::Printer(PrintError::Connection(_))));
        assert!(err.is_connection_failure());
        assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
        assert!(executor.is_idle());
    }

    #[test]
    fn test_connection_failure_classification() {
        assert!(JobError::Timeout(PRINT_TIMEOUT).is_connection_failure());
        assert!(!JobError::Busy { current: 1 }.is_connection_failure());
        assert!(!JobError::Validation(ValidationError::NoItems).is_connection_failure());
        assert!(!JobError::Printer(PrintError::InvalidConfig("x".into())).is_connection_failure());
    }
}
