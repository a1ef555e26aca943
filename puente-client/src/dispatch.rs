//! Print dispatch client
//!
//! Publishes print jobs from the POS onto the broker. Every outcome ends in
//! exactly one user notification; success means the frame was handed to the
//! transport, there is no end-to-end acknowledgement from the bridge.

use std::sync::Arc;

use shared::PrintJob;
use shared::message::{JOB_SUBMIT_DESTINATION, JSON_CONTENT_TYPE, encode_job};
use tracing::{info, instrument, warn};

use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::link::LinkHandle;
use crate::notify::{Notifier, Severity};

const TITLE_UNAVAILABLE: &str = "Impresión no disponible";
const TITLE_SENT: &str = "Impresión enviada";
const TITLE_FAILED: &str = "Error de impresión";
const TITLE_INVALID: &str = "Ticket inválido";

/// Sends print jobs through a broker link
#[derive(Clone)]
pub struct PrintDispatcher {
    link: LinkHandle,
    notifier: Arc<dyn Notifier>,
    config: DispatchConfig,
}

impl PrintDispatcher {
    pub fn new(link: LinkHandle, notifier: Arc<dyn Notifier>, config: DispatchConfig) -> Self {
        Self {
            link,
            notifier,
            config,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Manual reconnect, resets the retry counter
    pub fn reconnect(&self) {
        self.link.reconnect();
    }

    /// Publish a job to the bridge
    #[instrument(skip(self, job), fields(target = %job.printer_target, ticket = %job.ticket_type))]
    pub async fn dispatch(&self, job: &PrintJob) -> DispatchResult<()> {
        if !self.link.is_connected() {
            warn!("Broker not connected, printing unavailable");
            self.notifier.notify(
                Severity::Error,
                TITLE_UNAVAILABLE,
                "El sistema de impresión no está conectado. Intentando reconectar...",
            );
            self.link
                .reconnect_after(self.config.unavailable_reconnect_delay);
            return Err(DispatchError::Unavailable);
        }

        if let Err(e) = job.validate() {
            self.notifier
                .notify(Severity::Error, TITLE_INVALID, &e.to_string());
            return Err(e.into());
        }

        let body = match encode_job(job) {
            Ok(body) => body,
            Err(e) => {
                self.notifier
                    .notify(Severity::Error, TITLE_FAILED, &e.to_string());
                return Err(e.into());
            }
        };

        let headers = [("content-type", JSON_CONTENT_TYPE)];
        let publish = self.link.publish(JOB_SUBMIT_DESTINATION, &body, &headers);

        match tokio::time::timeout(self.config.publish_timeout, publish).await {
            Ok(Ok(())) => {
                info!(bytes = body.len(), "Print job published");
                self.notifier.notify(
                    Severity::Success,
                    TITLE_SENT,
                    &format!("Ticket enviado a {}", job.printer_target),
                );
                self.schedule_follow_up_check();
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Publish failed");
                self.notifier.notify(
                    Severity::Error,
                    TITLE_FAILED,
                    "Error de conexión. Intentando reconectar...",
                );
                self.link.reconnect_after(self.config.lost_reconnect_delay);
                Err(DispatchError::ConnectionLost(e.to_string()))
            }
            Err(_) => {
                warn!(timeout = ?self.config.publish_timeout, "Publish timed out");
                self.notifier.notify(
                    Severity::Error,
                    TITLE_FAILED,
                    "La impresión tardó demasiado. Verifique la conexión.",
                );
                Err(DispatchError::Timeout(self.config.publish_timeout))
            }
        }
    }

    /// Reconnect shortly after a publish if the link dropped meanwhile
    fn schedule_follow_up_check(&self) {
        let link = self.link.clone();
        let delay = self.config.follow_up_check_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !link.is_connected() && !link.is_shutting_down() {
                info!("Link dropped after publish, reconnecting");
                link.reconnect();
            }
        });
    }
}
