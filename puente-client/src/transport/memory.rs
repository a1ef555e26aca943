//! In-process broker transport
//!
//! Stands in for a broker in tests and offline demos: reachability,
//! publish failures and inbound traffic are driven by the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{BrokerTransport, EVENT_CAPACITY, TransportEvent};
use crate::error::TransportError;

/// A SEND frame captured by [`MemoryTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub destination: String,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Published {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct Inner {
    events: mpsc::Sender<TransportEvent>,
    connected: AtomicBool,
    reachable: AtomicBool,
    stall_publishes: AtomicBool,
    publish_failure: Mutex<Option<TransportError>>,
    activations: AtomicUsize,
    subscriptions: Mutex<Vec<String>>,
    published: Mutex<Vec<Published>>,
}

/// Broker simulated in memory
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    /// Create a reachable transport and the receiver of its events
    pub fn new() -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events, rx) = mpsc::channel(EVENT_CAPACITY);
        let inner = Inner {
            events,
            connected: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            stall_publishes: AtomicBool::new(false),
            publish_failure: Mutex::new(None),
            activations: AtomicUsize::new(0),
            subscriptions: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    /// Whether `activate` succeeds
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Make every publish fail with `error` (or succeed again with `None`)
    pub fn fail_publishes(&self, error: Option<TransportError>) {
        *self.inner.publish_failure.lock() = error;
    }

    /// Make every publish hang forever
    pub fn stall_publishes(&self, stall: bool) {
        self.inner.stall_publishes.store(stall, Ordering::SeqCst);
    }

    /// Deliver a MESSAGE on a destination
    pub async fn deliver(&self, destination: &str, body: &str) {
        let _ = self
            .inner
            .events
            .send(TransportEvent::Message {
                destination: destination.to_string(),
                body: body.to_string(),
            })
            .await;
    }

    /// Drop the session as a broker failure would
    pub async fn drop_connection(&self, event: TransportEvent) {
        if self.inner.connected.swap(false, Ordering::SeqCst) {
            self.inner.subscriptions.lock().clear();
            let _ = self.inner.events.send(event).await;
        }
    }

    /// Number of `activate` calls so far
    pub fn activations(&self) -> usize {
        self.inner.activations.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.subscriptions.lock().clone()
    }

    pub fn published(&self) -> Vec<Published> {
        self.inner.published.lock().clone()
    }
}

#[async_trait]
impl BrokerTransport for MemoryTransport {
    async fn activate(&self) -> Result<(), TransportError> {
        self.inner.activations.fetch_add(1, Ordering::SeqCst);
        if !self.inner.reachable.load(Ordering::SeqCst) {
            return Err(TransportError::Connection(
                "memory broker unreachable".to_string(),
            ));
        }
        self.inner.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn deactivate(&self) {
        self.inner.connected.store(false, Ordering::SeqCst);
        self.inner.subscriptions.lock().clear();
    }

    async fn subscribe(&self, destination: &str) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.inner
            .subscriptions
            .lock()
            .push(destination.to_string());
        Ok(())
    }

    async fn publish(
        &self,
        destination: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<(), TransportError> {
        if self.inner.stall_publishes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.inner.publish_failure.lock().clone() {
            return Err(err);
        }
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.inner.published.lock().push(Published {
            destination: destination.to_string(),
            body: body.to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}
