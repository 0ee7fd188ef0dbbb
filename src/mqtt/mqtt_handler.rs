use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ClientError, Event, EventLoop, LastWill, MqttOptions, Outgoing, Packet, QoS,
    Transport,
};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::{MqttConfig, TlsConfig};
use super::message_manager::MqttMessage;

const REQUEST_CAPACITY: usize = 100;
const INBOUND_CAPACITY: usize = 100;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum MqttError {
    #[error("MQTT client request failed: {0}")]
    Client(#[from] ClientError),

    #[error("failed to read TLS file {path}: {source}")]
    TlsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TLS setup: {0}")]
    Tls(String),
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Reconnecting,
}

/// Outbound side of the MQTT transport as seen by the bridge
#[async_trait]
pub trait StatePublisher: Send + Sync + 'static {
    async fn publish(
        &self,
        topic: String,
        payload: String,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError>;
}

/// Retained message the broker publishes if the connection drops uncleanly
#[derive(Debug, Clone)]
pub struct Will {
    pub topic: String,
    pub payload: String,
}

/// Connection to the broker
///
/// The event loop runs in a background task. Every filter in the subscription
/// set is (re)subscribed on each `ConnAck`, so the set stays the same across
/// broker reconnects.
pub struct MqttHandle {
    client: AsyncClient,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttHandle {
    pub async fn connect(
        config: &MqttConfig,
        subscriptions: Vec<String>,
        will: Option<Will>,
    ) -> Result<(Self, mpsc::Receiver<MqttMessage>), MqttError> {
        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.host, config.port);
        mqtt_options.set_keep_alive(config.keep_alive());

        if let Some(username) = &config.username {
            mqtt_options.set_credentials(username, config.password.clone().unwrap_or_default());
        }
        if let Some(will) = will {
            mqtt_options.set_last_will(LastWill::new(
                will.topic,
                will.payload.into_bytes(),
                QoS::AtLeastOnce,
                true,
            ));
        }
        mqtt_options.set_transport(build_transport(config.tls.as_ref()).await?);

        let (client, eventloop) = AsyncClient::new(mqtt_options, REQUEST_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let cancel = CancellationToken::new();

        info!(
            "Connecting to MQTT broker {}:{} (TLS: {}, auth: {})",
            config.host,
            config.port,
            config.tls.is_some(),
            config.username.is_some()
        );

        let task = tokio::spawn(run_event_loop(
            eventloop,
            client.clone(),
            subscriptions,
            inbound_tx,
            cancel.clone(),
        ));

        let handle = MqttHandle {
            client,
            cancel,
            task: Mutex::new(Some(task)),
        };
        Ok((handle, inbound_rx))
    }

    /// Sends DISCONNECT and stops the event loop. Later calls do nothing.
    pub async fn disconnect(&self) {
        let Some(task) = self.task.lock().await.take() else {
            return;
        };

        if let Err(e) = self.client.disconnect().await {
            debug!("Could not queue MQTT disconnect: {}", e);
        }
        if tokio::time::timeout(DISCONNECT_TIMEOUT, task).await.is_err() {
            warn!("MQTT event loop did not stop in time, cancelling");
        }
        self.cancel.cancel();
        info!("Disconnected from MQTT broker");
    }
}

#[async_trait]
impl StatePublisher for MqttHandle {
    async fn publish(
        &self,
        topic: String,
        payload: String,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        self.client
            .publish(topic, qos, retain, payload.into_bytes())
            .await?;
        Ok(())
    }
}

async fn run_event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    subscriptions: Vec<String>,
    inbound: mpsc::Sender<MqttMessage>,
    cancel: CancellationToken,
) {
    let mut state = ConnectionState::default();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("MQTT connection established ({:?})", ack.code);
                state = ConnectionState::Connected;

                for filter in &subscriptions {
                    // try_subscribe: the event loop is not polled while we wait here
                    match client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                        Ok(()) => debug!("Subscribing to {}", filter),
                        Err(e) => error!("Failed to subscribe to {}: {}", filter, e),
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let message = MqttMessage::from_bytes(publish.topic, &publish.payload);
                // Keep polling without a consumer so queued publishes still go out.
                if let Err(e) = inbound.send(message).await {
                    debug!("No consumer for inbound message on {}", e.0.topic);
                }
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!("Subscription acknowledged: {:?}", ack.return_codes);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if state == ConnectionState::Reconnecting {
                    debug!("MQTT still unreachable: {}", e);
                } else {
                    error!("MQTT connection error: {}", e);
                }
                state = ConnectionState::Reconnecting;

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        }
    }

    debug!("MQTT event loop stopped");
}

async fn build_transport(tls: Option<&TlsConfig>) -> Result<Transport, MqttError> {
    let Some(tls) = tls else {
        return Ok(Transport::tcp());
    };

    let ca = match &tls.ca_path {
        Some(path) => Some(read_tls_file(path).await?),
        None => None,
    };
    let client_auth = match (&tls.client_cert_path, &tls.client_key_path) {
        (Some(cert), Some(key)) => Some((read_tls_file(cert).await?, read_tls_file(key).await?)),
        (None, None) => None,
        _ => {
            return Err(MqttError::Tls(
                "client certificate and key must be provided together".to_string(),
            ))
        }
    };

    match (ca, client_auth) {
        (None, None) => Ok(Transport::tls_with_default_config()),
        (None, Some(_)) => Err(MqttError::Tls(
            "a CA certificate is required when using a client certificate".to_string(),
        )),
        (Some(ca), client_auth) => Ok(Transport::tls(ca, client_auth, None)),
    }
}

async fn read_tls_file(path: &std::path::Path) -> Result<Vec<u8>, MqttError> {
    tokio::fs::read(path).await.map_err(|source| MqttError::TlsFile {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn plain_tcp_without_tls_section() {
        assert!(matches!(build_transport(None).await, Ok(Transport::Tcp)));
    }

    #[tokio::test]
    async fn rejects_half_client_pair() {
        let tls = TlsConfig {
            ca_path: None,
            client_cert_path: Some(PathBuf::from("/nonexistent/cert.pem")),
            client_key_path: None,
        };
        assert!(matches!(build_transport(Some(&tls)).await, Err(MqttError::Tls(_))));
    }

    #[tokio::test]
    async fn reports_unreadable_ca() {
        let tls = TlsConfig {
            ca_path: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..TlsConfig::default()
        };
        assert!(matches!(
            build_transport(Some(&tls)).await,
            Err(MqttError::TlsFile { .. })
        ));
    }
}
