//! # MQTT Integration Module
//!
//! Broker side of the bridge. Connection management, keep-alive, TLS and
//! resubscription after broker restarts live here; the bridge only sees an
//! inbound channel of [`MqttMessage`]s and the [`StatePublisher`] trait.
//!
//! ## Module Architecture
//!
//! ```text
//! mqtt/
//! ├── config.rs           - Broker address, credentials and TLS files
//! ├── message_manager.rs  - Inbound message representation
//! └── mqtt_handler.rs     - Event loop task, publisher and disconnect handling
//! ```

pub mod config;
pub mod message_manager;
pub mod mqtt_handler;

pub use config::{MqttConfig, TlsConfig};
pub use message_manager::MqttMessage;
pub use mqtt_handler::{MqttError, MqttHandle, StatePublisher, Will};
pub use rumqttc::QoS;
