//! Receiver collaborator interface
//!
//! The bridge talks to the receiver only through [`ReceiverClient`]. Anything
//! the receiver reports (decoded state changes, raw traffic, transport faults)
//! arrives as a [`ReceiverEvent`] on the channel handed to the client when it
//! was built.

use async_trait::async_trait;
use thiserror::Error;

use super::command::Command;

/// Errors raised by a receiver transport
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Opening the connection failed
    #[error("failed to connect to receiver at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to receiver at {0}")]
    ConnectTimeout(String),

    /// The client is closed, e.g. while a reconnect is in progress
    #[error("receiver connection is not open")]
    NotConnected,

    #[error("receiver closed the connection")]
    ConnectionClosed,

    /// Reading or writing the stream failed
    #[error("receiver i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The inbound byte stream can no longer be split into messages
    #[error("receiver stream desynchronized: {0}")]
    Desync(String),
}

/// Everything a receiver transport reports back
#[derive(Debug)]
pub enum ReceiverEvent {
    /// The receiver announced the current value of a control
    CommandReceived(Command),
    /// Raw message written to the receiver
    MessageSent(String),
    /// Raw message read from the receiver, recognized or not
    MessageReceived(String),
    /// The transport failed; the connection should be considered lost
    TransportError(ReceiverError),
}

/// Connection to a receiver
///
/// Implementations must tolerate `close` being called repeatedly and
/// concurrently with `send_command`, and `connect` must release any previous
/// connection before opening a new one.
#[async_trait]
pub trait ReceiverClient: Send + Sync + 'static {
    async fn connect(&self) -> Result<(), ReceiverError>;

    async fn close(&self);

    /// Writes a command to the receiver. Resolves once the command has been
    /// handed to the transport, not when the receiver answers.
    async fn send_command(&self, command: Command) -> Result<(), ReceiverError>;
}
