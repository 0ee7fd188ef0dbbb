//! Receiver session with statum state machine
//!
//! # State Machine
//!
//! ```text
//!                 connect()          sync()
//! Disconnected ─────────────► Connecting ────────► Synced
//!    ▲  ▲                         │                  │
//!    │  └──── sync failed ────────┘                  │
//!    └───────────────────── close() ─────────────────┘
//! ```
//!
//! Failed transitions hand the session back as `Disconnected`, so a caller
//! can retry without rebuilding it. A session only reaches `Synced` after the
//! startup query battery has been written, so any code holding a
//! `Session<Synced>` can rely on the MQTT state being refreshed.

use std::sync::Arc;

use statum::{machine, state};
use tracing::info;

use super::error::BridgeError;
use super::sync::run_startup_sync;
use crate::receiver::{ReceiverClient, ZoneId};

/// A failed transition: the session, back in `Disconnected`, and the cause
pub type Failed = (Session<Disconnected>, BridgeError);

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Disconnected, // No receiver connection held
    Connecting,   // Connection open, state not yet requested
    Synced,       // Startup queries written, events flowing
}

#[machine]
pub struct Session<S: SessionState> {
    receiver: Arc<dyn ReceiverClient>,
    sync_zone: ZoneId,
}

impl<S: SessionState> Session<S> {
    pub fn receiver(&self) -> &Arc<dyn ReceiverClient> {
        &self.receiver
    }
}

impl Session<Disconnected> {
    pub fn create(receiver: Arc<dyn ReceiverClient>, sync_zone: ZoneId) -> Self {
        Self::new(receiver, sync_zone)
    }

    pub async fn connect(self) -> Result<Session<Connecting>, Failed> {
        info!("Opening receiver connection");
        match self.receiver.connect().await {
            Ok(()) => Ok(self.transition()),
            Err(e) => Err((self, BridgeError::Connect(e))),
        }
    }

    /// Connects and syncs
    pub async fn start(self) -> Result<Session<Synced>, Failed> {
        self.connect().await?.sync().await
    }
}

impl Session<Connecting> {
    pub async fn sync(self) -> Result<Session<Synced>, Failed> {
        match run_startup_sync(self.receiver.as_ref(), self.sync_zone).await {
            Ok(issued) => {
                info!("Startup sync issued {} queries", issued);
                Ok(self.transition())
            }
            Err(e) => Err((self.close().await, BridgeError::Sync(e))),
        }
    }

    pub async fn close(self) -> Session<Disconnected> {
        self.receiver.close().await;
        self.transition()
    }
}

impl Session<Synced> {
    /// Releases the receiver connection
    pub async fn close(self) -> Session<Disconnected> {
        info!("Closing receiver session");
        self.receiver.close().await;
        self.transition()
    }
}
