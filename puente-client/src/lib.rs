//! # puente-client
//!
//! Broker side of the print bridge: a STOMP 1.2 over WebSocket link with
//! bounded reconnection, plus the dispatch client the POS uses to publish
//! print jobs.
//!
//! ## Layers
//!
//! - [`stomp`]: frame codec and heart-beat negotiation
//! - [`transport`]: [`BrokerTransport`] trait, WebSocket and in-memory transports
//! - [`link`]: reconnect [`Supervisor`] (pure state machine) and the
//!   [`BrokerLink`] task that executes its decisions
//! - [`dispatch`]: [`PrintDispatcher`], publishes jobs and reports outcomes
//!   through a [`Notifier`]
//!
//! ## Example
//!
//! ```ignore
//! use puente_client::{BrokerLink, LinkPolicy, StompConfig, StompWsTransport, TracingNotifier};
//! use std::sync::Arc;
//!
//! let (transport, events) = StompWsTransport::new("ws://pos.local:8080/ws", StompConfig::default());
//! let (link, mut jobs) = BrokerLink::new(Arc::new(transport), events, LinkPolicy::bridge(), Arc::new(TracingNotifier))
//!     .subscribe_to(shared::JOB_TOPIC);
//! let handle = link.spawn();
//! while let Some(msg) = jobs.recv().await {
//!     println!("{}", msg.body);
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod notify;
pub mod stomp;
pub mod transport;

// Re-exports
pub use config::{DispatchConfig, Environment, LinkPolicy, StompConfig};
pub use dispatch::PrintDispatcher;
pub use error::{DispatchError, StompError, TransportError};
pub use link::{
    BrokerLink, FailureKind, InboundMessage, LastActivity, LinkAction, LinkEvent, LinkHandle,
    LinkState, LinkStatus, Supervisor,
};
pub use notify::{Notification, Notifier, RecordingNotifier, Severity, TracingNotifier};
pub use stomp::{Command, Frame};
pub use transport::{
    BrokerTransport, MemoryTransport, Published, StompWsTransport, TransportEvent,
};
