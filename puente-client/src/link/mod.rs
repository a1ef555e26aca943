//! Broker link: reconnect supervision and its async runtime

mod runtime;
mod supervisor;

pub use runtime::{BrokerLink, InboundMessage, LastActivity, LinkHandle, LinkStatus};
pub use supervisor::{FailureKind, LinkAction, LinkEvent, LinkState, Supervisor};
