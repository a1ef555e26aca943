//! BrokerLink: one task driving a [`Supervisor`] over a [`BrokerTransport`]
//!
//! The task multiplexes shutdown, manual reconnect requests, transport
//! events, the retry timer and the health interval. Status is published on a
//! `watch` channel; MESSAGE frames on the subscribed topic are forwarded to
//! the consumer channel in delivery order.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tokio_util::sync::CancellationToken;

use super::supervisor::{FailureKind, LinkAction, LinkEvent, LinkState, Supervisor};
use crate::config::LinkPolicy;
use crate::error::TransportError;
use crate::notify::{Notifier, Severity};
use crate::transport::{BrokerTransport, TransportEvent};

/// Inbound messages buffered for the consumer
const INBOUND_CAPACITY: usize = 64;

/// Time of the last completed job, shared with whoever records it
pub type LastActivity = Arc<Mutex<Option<DateTime<Local>>>>;

/// Snapshot of a link
#[derive(Debug, Clone, PartialEq)]
pub struct LinkStatus {
    pub state: LinkState,
    pub reconnect_attempts: u32,
    pub connected_since: Option<DateTime<Local>>,
}

impl LinkStatus {
    fn initial() -> Self {
        Self {
            state: LinkState::Disconnected,
            reconnect_attempts: 0,
            connected_since: None,
        }
    }
}

/// MESSAGE frame on the subscribed topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub destination: String,
    pub body: String,
}

#[derive(Debug)]
enum LinkCommand {
    Reconnect,
}

/// Broker connection manager, consumed by [`BrokerLink::spawn`]
pub struct BrokerLink {
    transport: Arc<dyn BrokerTransport>,
    events: mpsc::Receiver<TransportEvent>,
    supervisor: Supervisor,
    notifier: Arc<dyn Notifier>,
    topic: Option<String>,
    inbound: Option<mpsc::Sender<InboundMessage>>,
    last_activity: Option<LastActivity>,
    retry: Option<Pin<Box<Sleep>>>,
    status: watch::Sender<LinkStatus>,
    started_at: Instant,
}

impl BrokerLink {
    pub fn new(
        transport: Arc<dyn BrokerTransport>,
        events: mpsc::Receiver<TransportEvent>,
        policy: LinkPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status, _) = watch::channel(LinkStatus::initial());
        Self {
            transport,
            events,
            supervisor: Supervisor::new(policy),
            notifier,
            topic: None,
            inbound: None,
            last_activity: None,
            retry: None,
            status,
            started_at: Instant::now(),
        }
    }

    /// Subscribe every session to `topic` and receive its messages
    pub fn subscribe_to(mut self, topic: &str) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        self.topic = Some(topic.to_string());
        self.inbound = Some(tx);
        (self, rx)
    }

    /// Report the last completed job in health logs
    pub fn with_last_activity(mut self, last_activity: LastActivity) -> Self {
        self.last_activity = Some(last_activity);
        self
    }

    /// Start the link task
    pub fn spawn(self) -> LinkHandle {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let shutting_down = Arc::new(AtomicBool::new(false));

        let handle = LinkHandle {
            transport: self.transport.clone(),
            commands,
            status: self.status.subscribe(),
            shutdown: shutdown.clone(),
            shutting_down,
            task: Arc::new(Mutex::new(None)),
        };

        let task = tokio::spawn(self.run(commands_rx, shutdown));
        *handle.task.lock() = Some(task);
        handle
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<LinkCommand>,
        shutdown: CancellationToken,
    ) {
        tracing::info!("Broker link started");
        self.apply(LinkEvent::Start).await;

        let period = self.supervisor.policy().health_check_interval;
        let mut health = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    self.apply(LinkEvent::Shutdown).await;
                    break;
                }

                Some(command) = commands.recv() => match command {
                    LinkCommand::Reconnect => {
                        tracing::info!("Manual reconnect requested");
                        self.apply(LinkEvent::ManualReconnect).await;
                    }
                },

                event = self.events.recv() => match event {
                    Some(event) => self.on_transport_event(event).await,
                    None => {
                        tracing::warn!("Transport event channel closed, stopping link");
                        break;
                    }
                },

                _ = wait_retry(&mut self.retry) => {
                    self.retry = None;
                    self.apply(LinkEvent::RetryElapsed).await;
                }

                _ = health.tick() => {
                    self.log_health();
                    self.apply(LinkEvent::HealthTick).await;
                }
            }
        }

        tracing::info!("Broker link stopped");
    }

    /// Feed an event and carry out the resulting actions until quiescent
    async fn apply(&mut self, event: LinkEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            for action in self.supervisor.handle(event) {
                if let Some(next) = self.execute(action).await {
                    queue.push_back(next);
                }
            }
        }
        self.publish_status();
    }

    async fn execute(&mut self, action: LinkAction) -> Option<LinkEvent> {
        match action {
            LinkAction::Activate => {
                tracing::info!(
                    attempt = self.supervisor.attempts(),
                    "Connecting to broker"
                );
                match self.transport.activate().await {
                    Ok(()) => Some(LinkEvent::ConnectSucceeded),
                    Err(e) => {
                        tracing::error!(error = %e, "Broker connection failed");
                        Some(LinkEvent::ConnectFailed(failure_kind(&e)))
                    }
                }
            }
            LinkAction::Subscribe => {
                tracing::info!("Connected to broker");
                let topic = self.topic.clone()?;
                match self.transport.subscribe(&topic).await {
                    Ok(()) => None,
                    Err(e) => {
                        tracing::error!(%topic, error = %e, "Subscription failed");
                        Some(LinkEvent::ConnectionLost(failure_kind(&e)))
                    }
                }
            }
            LinkAction::ScheduleRetry { attempt, delay } => {
                let max = self.supervisor.policy().max_reconnect_attempts;
                tracing::warn!(
                    attempt,
                    max,
                    delay_secs = delay.as_secs(),
                    "Scheduling broker reconnect"
                );
                self.notifier.notify(
                    Severity::Warning,
                    "Reconectando",
                    &format!(
                        "Intento {attempt}/{max} en {} segundos",
                        delay.as_secs()
                    ),
                );
                self.retry = Some(Box::pin(tokio::time::sleep(delay)));
                None
            }
            LinkAction::CancelRetry => {
                self.retry = None;
                None
            }
            LinkAction::NotifyDisabled => {
                tracing::error!(
                    max = self.supervisor.policy().max_reconnect_attempts,
                    "Max reconnect attempts reached, printing disabled"
                );
                self.notifier.notify(
                    Severity::Error,
                    "Impresión deshabilitada",
                    "Se agotaron los intentos de reconexión. Reconecte manualmente.",
                );
                None
            }
            LinkAction::Deactivate => {
                self.transport.deactivate().await;
                None
            }
        }
    }

    async fn on_transport_event(&mut self, event: TransportEvent) {
        let kind = match event {
            TransportEvent::Message { destination, body } => {
                self.forward(InboundMessage { destination, body }).await;
                return;
            }
            TransportEvent::StompError(reason) => {
                tracing::error!(%reason, "Broker ERROR frame");
                FailureKind::Protocol
            }
            TransportEvent::WebSocketError(reason) => {
                tracing::error!(%reason, "WebSocket error");
                FailureKind::Transport
            }
            TransportEvent::Closed => {
                tracing::warn!("WebSocket closed by broker");
                FailureKind::Closed
            }
        };

        if !self.supervisor.is_shutting_down() {
            self.notifier.notify(
                Severity::Error,
                "Conexión perdida",
                "Se perdió la conexión con el sistema de impresión",
            );
        }
        self.apply(LinkEvent::ConnectionLost(kind)).await;
    }

    async fn forward(&self, message: InboundMessage) {
        let Some(inbound) = &self.inbound else {
            return;
        };
        if self.topic.as_deref() != Some(message.destination.as_str()) {
            tracing::debug!(destination = %message.destination, "Ignoring message on foreign destination");
            return;
        }
        if inbound.send(message).await.is_err() {
            tracing::debug!("Inbound consumer gone, message dropped");
        }
    }

    fn publish_status(&mut self) {
        let state = self.supervisor.state();
        let attempts = self.supervisor.attempts();
        self.status.send_modify(|status| {
            if state == LinkState::Connected && status.state != LinkState::Connected {
                status.connected_since = Some(Local::now());
            } else if state != LinkState::Connected {
                status.connected_since = None;
            }
            status.state = state;
            status.reconnect_attempts = attempts;
        });
    }

    fn log_health(&self) {
        let status = self.status.borrow().clone();
        let uptime = self.started_at.elapsed();
        let last_print = self
            .last_activity
            .as_ref()
            .and_then(|last| *last.lock())
            .map(|at| at.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());

        tracing::info!(
            state = status.state.as_str(),
            attempts = status.reconnect_attempts,
            uptime_secs = uptime.as_secs(),
            %last_print,
            "Link health check"
        );
    }
}

fn failure_kind(err: &TransportError) -> FailureKind {
    match err {
        TransportError::Rejected(_) | TransportError::Protocol(_) => FailureKind::Protocol,
        _ => FailureKind::Transport,
    }
}

async fn wait_retry(retry: &mut Option<Pin<Box<Sleep>>>) {
    match retry {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Cloneable control surface of a running [`BrokerLink`]
#[derive(Clone)]
pub struct LinkHandle {
    transport: Arc<dyn BrokerTransport>,
    commands: mpsc::UnboundedSender<LinkCommand>,
    status: watch::Receiver<LinkStatus>,
    shutdown: CancellationToken,
    shutting_down: Arc<AtomicBool>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LinkHandle {
    /// Session open and supervisor in `Connected`
    pub fn is_connected(&self) -> bool {
        self.status.borrow().state == LinkState::Connected && self.transport.is_connected()
    }

    pub fn status(&self) -> LinkStatus {
        self.status.borrow().clone()
    }

    /// Status receiver for observers
    pub fn watch_status(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    /// Reset the retry counter and reconnect now
    pub fn reconnect(&self) {
        if self.is_shutting_down() {
            return;
        }
        let _ = self.commands.send(LinkCommand::Reconnect);
    }

    /// [`Self::reconnect`] after `delay`, in the background
    pub fn reconnect_after(&self, delay: Duration) {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = handle.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => handle.reconnect(),
            }
        });
    }

    /// SEND through the current session
    pub async fn publish(
        &self,
        destination: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<(), TransportError> {
        if self.is_shutting_down() {
            return Err(TransportError::NotConnected);
        }
        self.transport.publish(destination, body, headers).await
    }

    /// Raise the shutdown flag; later reconnect requests are ignored
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Stop the link: deactivate the transport and wait for the task
    pub async fn shutdown(&self) {
        self.begin_shutdown();
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Broker link task failed");
            }
        }
    }
}
