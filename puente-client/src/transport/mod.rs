//! Broker transports
//!
//! A transport owns one STOMP session at a time. Session outcomes that are
//! not replies to a call (inbound messages, broker ERROR frames, socket
//! errors, close) are reported on the [`TransportEvent`] channel handed out
//! at construction; each session reports at most one terminal event.

mod memory;
mod ws;

pub use memory::{MemoryTransport, Published};
pub use ws::{StompWsTransport, WsStream};

use async_trait::async_trait;

use crate::error::TransportError;

/// Capacity of the transport event channel
pub(crate) const EVENT_CAPACITY: usize = 256;

/// Asynchronous session outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// MESSAGE frame on a subscribed destination
    Message { destination: String, body: String },
    /// Broker ERROR frame; the session is over
    StompError(String),
    /// Socket failure or heart-beat loss; the session is over
    WebSocketError(String),
    /// Socket closed by the peer; the session is over
    Closed,
}

impl TransportEvent {
    /// Whether the event ends the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransportEvent::Message { .. })
    }
}

/// Duplex connection to the STOMP broker
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Open a session (no-op when already connected)
    async fn activate(&self) -> Result<(), TransportError>;

    /// Close the session without emitting a terminal event
    async fn deactivate(&self);

    /// Subscribe the current session to a destination
    async fn subscribe(&self, destination: &str) -> Result<(), TransportError>;

    /// SEND a body; success means the frame was handed to the session
    async fn publish(
        &self,
        destination: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}
