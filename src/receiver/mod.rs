//! # Receiver Module
//!
//! Everything on the receiver side of the bridge: the command model shared with
//! the topic codec, the collaborator interface the bridge consumes, and the
//! telnet transport used by the binary.
//!
//! ```text
//! receiver/
//! ├── command.rs   - Command, Control and ZoneId
//! ├── client.rs    - ReceiverClient trait, ReceiverEvent, ReceiverError
//! ├── config.rs    - Connection settings
//! ├── protocol.rs  - Command <-> line mapping
//! ├── codec.rs     - Carriage-return line framing
//! └── telnet.rs    - TCP transport
//! ```

pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod protocol;
pub mod telnet;

pub use client::{ReceiverClient, ReceiverError, ReceiverEvent};
pub use command::{Command, Control, ZoneId, ZoneIdError, QUERY};
pub use config::{ReceiverConfig, ReceiverTransport};
pub use telnet::TelnetClient;
