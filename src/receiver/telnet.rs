//! Telnet transport for the receiver
//!
//! One TCP connection at a time. A background task reads lines, reports every
//! line as raw traffic and recognized ones as [`ReceiverEvent::CommandReceived`].
//! Writes are serialized behind a mutex and paced by the configured command
//! interval.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, trace, warn};

use super::client::{ReceiverClient, ReceiverError, ReceiverEvent};
use super::codec::CarriageReturnCodec;
use super::command::Command;
use super::config::ReceiverConfig;
use super::protocol;

struct Connection {
    writer: FramedWrite<OwnedWriteHalf, CarriageReturnCodec>,
    reader: JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

pub struct TelnetClient {
    config: ReceiverConfig,
    events: mpsc::Sender<ReceiverEvent>,
    connection: Mutex<Option<Connection>>,
}

impl TelnetClient {
    pub fn new(config: ReceiverConfig, events: mpsc::Sender<ReceiverEvent>) -> Self {
        Self {
            config,
            events,
            connection: Mutex::new(None),
        }
    }

    async fn open(&self) -> Result<TcpStream, ReceiverError> {
        let address = self.config.address();
        let stream = tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect(&address),
        )
        .await
        .map_err(|_| ReceiverError::ConnectTimeout(address.clone()))?
        .map_err(|source| ReceiverError::Connect { address, source })?;

        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[async_trait]
impl ReceiverClient for TelnetClient {
    async fn connect(&self) -> Result<(), ReceiverError> {
        let mut guard = self.connection.lock().await;
        if guard.take().is_some() {
            debug!("Dropped previous receiver connection before reconnecting");
        }

        let stream = self.open().await?;
        let (read_half, write_half) = stream.into_split();

        let reader = tokio::spawn(read_lines(
            FramedRead::new(read_half, CarriageReturnCodec),
            self.events.clone(),
        ));

        *guard = Some(Connection {
            writer: FramedWrite::new(write_half, CarriageReturnCodec),
            reader,
        });

        info!("Connected to receiver at {}", self.config.address());
        Ok(())
    }

    async fn close(&self) {
        let Some(mut connection) = self.connection.lock().await.take() else {
            return;
        };

        // Stop reading first so our own shutdown is not reported as a fault.
        connection.reader.abort();
        if let Err(e) = connection.writer.close().await {
            debug!("Error while shutting down receiver stream: {}", e);
        }
        info!("Closed receiver connection to {}", self.config.address());
    }

    async fn send_command(&self, command: Command) -> Result<(), ReceiverError> {
        let line = protocol::encode(&command);

        let mut guard = self.connection.lock().await;
        let connection = guard.as_mut().ok_or(ReceiverError::NotConnected)?;
        connection.writer.send(line.clone()).await?;

        if self.events.try_send(ReceiverEvent::MessageSent(line)).is_err() {
            trace!("Event channel full, dropped sent-message notification");
        }

        // Hold the lock so the next write waits out the pacing interval.
        tokio::time::sleep(self.config.command_interval()).await;
        Ok(())
    }
}

async fn read_lines(
    mut lines: FramedRead<OwnedReadHalf, CarriageReturnCodec>,
    events: mpsc::Sender<ReceiverEvent>,
) {
    let cause = loop {
        match lines.next().await {
            Some(Ok(line)) => {
                let command = protocol::parse(&line);
                if events
                    .send(ReceiverEvent::MessageReceived(line))
                    .await
                    .is_err()
                {
                    return;
                }
                if let Some(command) = command {
                    if events
                        .send(ReceiverEvent::CommandReceived(command))
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
            Some(Err(e)) => break e,
            None => break ReceiverError::ConnectionClosed,
        }
    };

    warn!("Receiver read loop stopped: {}", cause);
    let _ = events.send(ReceiverEvent::TransportError(cause)).await;
}
