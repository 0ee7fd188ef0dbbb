//! Session bridge between the MQTT topic surface and the receiver
//!
//! Implements a three-stage pipeline around a single receiver session:
//!
//! 1. [`session`] - Connection lifecycle as a typestate machine
//! 2. [`sync`] - Query battery issued after every connect
//! 3. [`bridge_handle`] - Event loop routing messages in both directions
//!
//! Transport faults are handled according to the deployment's [`FaultPolicy`].
//!
//! # Architecture
//!
//! ```text
//! MQTT ──► decode ──► ReceiverClient::send_command
//!                                  │
//! MQTT ◄── publish ◄── encode ◄── ReceiverEvent
//! ```

pub mod bridge_handle;
pub mod error;
pub mod fault;
pub mod session;
pub mod sync;

pub use bridge_handle::{BridgeHandle, BridgeSettings, OFFLINE, ONLINE};
pub use error::BridgeError;
pub use fault::{FaultAction, FaultPolicy};
pub use session::{Session, SessionState};
pub use sync::{run_startup_sync, startup_queries};
