use std::time::Duration;

use denon_mqtt::receiver::{
    Command, Control, ReceiverClient, ReceiverConfig, ReceiverError, ReceiverEvent, TelnetClient,
    ZoneId,
};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

async fn listener() -> (TcpListener, ReceiverConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = ReceiverConfig::new("test", "127.0.0.1");
    config.port = listener.local_addr().unwrap().port();
    config.command_interval_ms = 0;
    (listener, config)
}

async fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = Vec::new();
    reader.read_until(b'\r', &mut line).await.unwrap();
    String::from_utf8(line).unwrap()
}

async fn next_event(events: &mut mpsc::Receiver<ReceiverEvent>) -> ReceiverEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("event in time")
        .expect("channel open")
}

#[tokio::test]
async fn writes_commands_and_reports_replies() {
    let (listener, config) = listener().await;
    let (events_tx, mut events) = mpsc::channel(16);
    let client = TelnetClient::new(config, events_tx);

    client.connect().await.unwrap();
    let (stream, _) = listener.accept().await.unwrap();
    let mut server = BufReader::new(stream);

    client
        .send_command(Command::new(Control::Power, "ON"))
        .await
        .unwrap();
    assert_eq!(read_line(&mut server).await, "PWON\r");

    client
        .send_command(Command::query(Control::ZoneMute(ZoneId::new(2).unwrap())))
        .await
        .unwrap();
    assert_eq!(read_line(&mut server).await, "Z2MU?\r");

    server
        .get_mut()
        .write_all(b"MV50\rMVMAX 98\r")
        .await
        .unwrap();

    assert!(matches!(next_event(&mut events).await, ReceiverEvent::MessageSent(l) if l == "PWON"));
    assert!(matches!(next_event(&mut events).await, ReceiverEvent::MessageSent(l) if l == "Z2MU?"));
    assert!(matches!(next_event(&mut events).await, ReceiverEvent::MessageReceived(l) if l == "MV50"));
    match next_event(&mut events).await {
        ReceiverEvent::CommandReceived(command) => {
            assert_eq!(command, Command::new(Control::Volume, "50"))
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        next_event(&mut events).await,
        ReceiverEvent::MessageReceived(l) if l == "MVMAX 98"
    ));

    drop(server);
    assert!(matches!(
        next_event(&mut events).await,
        ReceiverEvent::TransportError(ReceiverError::ConnectionClosed)
    ));

    client.close().await;
}

#[tokio::test]
async fn send_before_connect_fails() {
    let (_listener, config) = listener().await;
    let (events_tx, _events) = mpsc::channel(16);
    let client = TelnetClient::new(config, events_tx);

    let result = client.send_command(Command::query(Control::Power)).await;
    assert!(matches!(result, Err(ReceiverError::NotConnected)));
}

#[tokio::test]
async fn refused_connection_is_reported() {
    let (listener, config) = listener().await;
    drop(listener);
    let (events_tx, _events) = mpsc::channel(16);
    let client = TelnetClient::new(config, events_tx);

    let result = client.connect().await;
    assert!(matches!(result, Err(ReceiverError::Connect { .. })));
}

#[tokio::test]
async fn close_is_quiet_and_repeatable() {
    let (listener, config) = listener().await;
    let (events_tx, mut events) = mpsc::channel(16);
    let client = TelnetClient::new(config, events_tx);

    client.connect().await.unwrap();
    let (_stream, _) = listener.accept().await.unwrap();

    client.close().await;
    client.close().await;

    let result = client.send_command(Command::query(Control::Power)).await;
    assert!(matches!(result, Err(ReceiverError::NotConnected)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(events.try_recv().is_err(), "no fault after a local close");
}

#[tokio::test]
async fn reconnect_replaces_the_connection() {
    let (listener, config) = listener().await;
    let (events_tx, _events) = mpsc::channel(16);
    let client = TelnetClient::new(config, events_tx);

    client.connect().await.unwrap();
    let (_first, _) = listener.accept().await.unwrap();
    client.connect().await.unwrap();
    let (second, _) = listener.accept().await.unwrap();
    let mut server = BufReader::new(second);

    client
        .send_command(Command::new(Control::Input, "DVD"))
        .await
        .unwrap();
    assert_eq!(read_line(&mut server).await, "SIDVD\r");

    client.close().await;
}
