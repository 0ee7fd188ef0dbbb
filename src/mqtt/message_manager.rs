use chrono::{DateTime, Local};
use std::fmt;

/// Inbound publish as handed to the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
    pub timestamp: DateTime<Local>,
}

impl fmt::Display for MqttMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.topic, self.payload)
    }
}

impl MqttMessage {
    pub fn from_topic(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        MqttMessage {
            topic: topic.into(),
            payload: payload.into(),
            timestamp: Local::now(),
        }
    }

    /// Decodes a raw publish; invalid UTF-8 is replaced rather than rejected
    pub fn from_bytes(topic: impl Into<String>, payload: &[u8]) -> Self {
        Self::from_topic(topic, String::from_utf8_lossy(payload).into_owned())
    }
}
