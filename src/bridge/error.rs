use thiserror::Error;

use crate::receiver::ReceiverError;

/// Errors that end a bridge session
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Opening the receiver connection failed, at startup or while self-healing
    #[error("failed to connect to receiver: {0}")]
    Connect(#[source] ReceiverError),

    /// Writing the startup query battery failed
    #[error("startup sync failed: {0}")]
    Sync(#[source] ReceiverError),

    /// A transport fault under the escalate policy
    #[error("receiver transport fault: {0}")]
    TransportFault(#[source] ReceiverError),

    /// A transport fault under the exit policy; the host should terminate with `code`
    #[error("receiver transport fault, exit with status {code} requested: {source}")]
    ExitRequested {
        code: i32,
        #[source]
        source: ReceiverError,
    },

    #[error("receiver event channel closed")]
    ReceiverChannelClosed,

    #[error("MQTT message channel closed")]
    MqttChannelClosed,

    #[error("bridge task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BridgeError {
    /// Process exit status requested by the fault policy, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            BridgeError::ExitRequested { code, .. } => Some(*code),
            _ => None,
        }
    }
}
