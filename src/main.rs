use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use denon_mqtt::bridge::{BridgeHandle, OFFLINE};
use denon_mqtt::config::{Config, CONFIG_ENV};
use denon_mqtt::mqtt::{MqttHandle, StatePublisher, Will};
use denon_mqtt::receiver::{ReceiverClient, TelnetClient};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const RECEIVER_EVENT_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let path = Config::resolve_path(
        std::env::args_os().nth(1).map(PathBuf::from),
        std::env::var_os(CONFIG_ENV).map(PathBuf::from),
    )?;
    let config = Config::load(&path).await?;
    let settings = config.bridge_settings()?;
    let root = settings.root.clone();

    info!(
        "Bridging receiver {} ({}) under {}",
        config.receiver.name,
        config.receiver.address(),
        root
    );

    let (receiver_tx, receiver_rx) = mpsc::channel(RECEIVER_EVENT_CAPACITY);
    let receiver: Arc<dyn ReceiverClient> =
        Arc::new(TelnetClient::new(config.receiver.clone(), receiver_tx));

    let will = Will {
        topic: root.status_topic(),
        payload: OFFLINE.to_string(),
    };
    let (mqtt, mqtt_rx) =
        MqttHandle::connect(&config.mqtt, vec![root.subscription()], Some(will)).await?;
    let mqtt = Arc::new(mqtt);
    let publisher: Arc<dyn StatePublisher> = mqtt.clone();

    let mut bridge =
        match BridgeHandle::spawn(settings, receiver, publisher, mqtt_rx, receiver_rx).await {
            Ok(bridge) => bridge,
            Err(e) => {
                mqtt.disconnect().await;
                return Err(eyre!("Failed to start bridge: {}", e));
            }
        };

    let fatal = tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => {
                info!("Shutdown requested");
                None
            }
            Err(e) => {
                error!("Failed to listen for ctrl-c: {}", e);
                bridge.wait().await.err()
            }
        },
        result = bridge.wait() => result.err(),
    };

    if let Err(e) = bridge.stop().await {
        error!("Bridge stopped with error: {}", e);
    }
    mqtt.disconnect().await;

    match fatal {
        Some(e) => match e.exit_code() {
            Some(code) => {
                error!("Exiting with status {}: {}", code, e);
                std::process::exit(code)
            }
            None => Err(eyre!("Bridge failed: {}", e)),
        },
        None => Ok(()),
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
