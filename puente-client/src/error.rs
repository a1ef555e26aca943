//! Client error types

use std::time::Duration;

use shared::ValidationError;
use thiserror::Error;

/// STOMP frame decoding error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StompError {
    #[error("Empty frame")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    #[error("Missing NUL terminator")]
    Unterminated,
}

/// Broker transport error
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Socket could not be opened
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Broker answered CONNECT with an ERROR frame
    #[error("Broker rejected connection: {0}")]
    Rejected(String),

    /// No session is open
    #[error("Not connected")]
    NotConnected,

    /// Session dropped while sending
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Handshake took too long
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Unexpected frame from the broker
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<StompError> for TransportError {
    fn from(err: StompError) -> Self {
        TransportError::Protocol(err.to_string())
    }
}

/// Print dispatch error
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Broker link is down; a reconnect has been scheduled
    #[error("Printing unavailable: broker not connected")]
    Unavailable,

    /// Job payload rejected before publishing
    #[error("Invalid print job: {0}")]
    Validation(#[from] ValidationError),

    /// Job could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failed while publishing
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Publish did not complete in time
    #[error("Publish timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;
