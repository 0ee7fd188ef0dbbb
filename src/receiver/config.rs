use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the bridge reaches the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverTransport {
    /// Line protocol over a raw TCP socket
    #[default]
    Telnet,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverConfig {
    /// Display name, used as the last segment of the topic root
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub transport: ReceiverTransport,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// The receiver ignores commands that arrive closer together than this
    #[serde(default = "default_command_interval_ms")]
    pub command_interval_ms: u64,
}

impl ReceiverConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: default_port(),
            transport: ReceiverTransport::default(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_interval_ms: default_command_interval_ms(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_interval(&self) -> Duration {
        Duration::from_millis(self.command_interval_ms)
    }
}

fn default_port() -> u16 {
    23
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_command_interval_ms() -> u64 {
    50
}
