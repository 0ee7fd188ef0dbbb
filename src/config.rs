//! Configuration file
//!
//! One TOML file with a section per collaborator. Only `mqtt.host`,
//! `receiver.name` and `receiver.host` are required; everything else has a
//! default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::bridge::{BridgeSettings, FaultPolicy};
use crate::mqtt::MqttConfig;
use crate::receiver::{ReceiverConfig, ZoneId, ZoneIdError};
use crate::topic::TopicRoot;

/// Environment variable naming the config file when no path is passed
pub const CONFIG_ENV: &str = "DENON_MQTT_CONFIG";

const CONFIG_DIR: &str = "denon-mqtt";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid sync zone: {0}")]
    Zone(#[from] ZoneIdError),

    #[error("no config path given and no user config directory found")]
    NoConfigDir,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    #[serde(default)]
    pub fault_policy: FaultPolicy,
    #[serde(default = "default_exit_code")]
    pub exit_code: i32,
    #[serde(default = "default_sync_zone")]
    pub sync_zone: u8,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::default(),
            exit_code: default_exit_code(),
            sync_zone: default_sync_zone(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_exit_code() -> i32 {
    1
}

fn default_sync_zone() -> u8 {
    2
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_in_flight() -> usize {
    32
}

impl Config {
    /// Parses and validates a config document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from {}", path.display());
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_toml(&content)
    }

    /// Picks the config path: explicit argument, then environment, then the
    /// user config directory
    pub fn resolve_path(
        argument: Option<PathBuf>,
        environment: Option<PathBuf>,
    ) -> Result<PathBuf, ConfigError> {
        if let Some(path) = argument.or(environment) {
            return Ok(path);
        }
        let path = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(CONFIG_DIR)
            .join(CONFIG_FILE);
        debug!("Using default config path {}", path.display());
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.receiver.name;
        if name.trim().is_empty() {
            return Err(ConfigError::Invalid("receiver.name must not be empty".into()));
        }
        if name.contains(['/', '+', '#']) {
            return Err(ConfigError::Invalid(format!(
                "receiver.name '{}' must not contain '/', '+' or '#'",
                name
            )));
        }
        if self.receiver.host.trim().is_empty() {
            return Err(ConfigError::Invalid("receiver.host must not be empty".into()));
        }
        if self.mqtt.host.trim().is_empty() {
            return Err(ConfigError::Invalid("mqtt.host must not be empty".into()));
        }
        if self.mqtt.password.is_some() && self.mqtt.username.is_none() {
            return Err(ConfigError::Invalid(
                "mqtt.password is set without mqtt.username".into(),
            ));
        }
        if let Some(tls) = &self.mqtt.tls {
            if tls.client_cert_path.is_some() != tls.client_key_path.is_some() {
                return Err(ConfigError::Invalid(
                    "mqtt.tls.client_cert_path and client_key_path must be set together".into(),
                ));
            }
        }
        if self.bridge.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "bridge.max_in_flight must be at least 1".into(),
            ));
        }
        ZoneId::new(self.bridge.sync_zone)?;
        Ok(())
    }

    pub fn topic_root(&self) -> TopicRoot {
        TopicRoot::for_device(&self.receiver.name)
    }

    pub fn bridge_settings(&self) -> Result<BridgeSettings, ConfigError> {
        Ok(BridgeSettings {
            root: self.topic_root(),
            fault_policy: self.bridge.fault_policy,
            exit_code: self.bridge.exit_code,
            sync_zone: ZoneId::new(self.bridge.sync_zone)?,
            reconnect_delay: Duration::from_millis(self.bridge.reconnect_delay_ms),
            max_in_flight: self.bridge.max_in_flight,
        })
    }
}
