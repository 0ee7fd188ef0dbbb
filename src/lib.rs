//! Bidirectional bridge between an MQTT broker and a Denon receiver
//!
//! ```text
//! src/
//! ├── receiver/   - Command model, line protocol and telnet client
//! ├── topic.rs    - MQTT topic <-> command translation
//! ├── mqtt/       - Broker connection and state publishing
//! ├── bridge/     - Session lifecycle, startup sync and fault policy
//! └── config.rs   - TOML configuration
//! ```

pub mod bridge;
pub mod config;
pub mod mqtt;
pub mod receiver;
pub mod topic;
