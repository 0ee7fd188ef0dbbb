//! Bridge Handle - running session between the broker and the receiver
//!
//! [`BridgeHandle::spawn`] brings the receiver session up (connect and startup
//! sync) and then moves the event loop into a tokio task:
//!
//! ```text
//! MqttMessage ──► TopicRoot::decode ──► JoinSet submission ──► ReceiverClient
//! ReceiverEvent ──► TopicRoot::state_topic ──► publish queue ──► StatePublisher
//! ```
//!
//! Nothing on the loop waits on either collaborator. Submissions run detached
//! (at most `max_in_flight` at a time), state publishes go through a queue
//! drained in order by a separate task, and a self-heal reconnect is polled
//! alongside intake rather than awaited.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::error::BridgeError;
use super::fault::{FaultAction, FaultPolicy};
use super::session::{Disconnected, Session, Synced};
use crate::mqtt::{MqttMessage, QoS, StatePublisher};
use crate::receiver::{Command, ReceiverClient, ReceiverError, ReceiverEvent, ZoneId};
use crate::topic::TopicRoot;

/// Availability payload published retained to the status topic
pub const ONLINE: &str = "online";
pub const OFFLINE: &str = "offline";

const PUBLISH_QUEUE_CAPACITY: usize = 256;
const PUBLISH_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub root: TopicRoot,
    pub fault_policy: FaultPolicy,
    /// Status requested by [`FaultPolicy::Exit`]
    pub exit_code: i32,
    /// Secondary zone covered by the startup sync
    pub sync_zone: ZoneId,
    /// First self-heal retry delay; doubles per failed attempt up to 30s
    pub reconnect_delay: Duration,
    /// Submissions beyond this many in flight are dropped
    pub max_in_flight: usize,
}

/// Handle to a running bridge
///
/// Dropping the handle does not stop the bridge; call [`BridgeHandle::stop`].
pub struct BridgeHandle {
    root: TopicRoot,
    publisher: Arc<dyn StatePublisher>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<Result<(), BridgeError>>>,
    stopped: bool,
}

impl BridgeHandle {
    /// Starts the session and spawns the event loop
    ///
    /// # Errors
    ///
    /// * [`BridgeError::Connect`] - the receiver could not be reached
    /// * [`BridgeError::Sync`] - the startup queries could not be written
    ///
    /// On error nothing is left running and the receiver is closed.
    pub async fn spawn(
        settings: BridgeSettings,
        receiver: Arc<dyn ReceiverClient>,
        publisher: Arc<dyn StatePublisher>,
        mqtt_rx: mpsc::Receiver<MqttMessage>,
        receiver_rx: mpsc::Receiver<ReceiverEvent>,
    ) -> Result<Self, BridgeError> {
        let span = info_span!("bridge", root = %settings.root);

        let session = Session::create(receiver.clone(), settings.sync_zone)
            .start()
            .instrument(span.clone())
            .await
            .map_err(|(_, e)| e)?;

        publish_status(publisher.as_ref(), &settings.root, ONLINE)
            .instrument(span.clone())
            .await;

        let (state_tx, state_rx) = mpsc::channel(PUBLISH_QUEUE_CAPACITY);
        let publish_task = tokio::spawn(
            publish_states(publisher.clone(), state_rx).instrument(span.clone()),
        );

        let shutdown = CancellationToken::new();
        let bridge = Bridge {
            root: settings.root.clone(),
            receiver,
            state_tx,
            publish_task,
            fault_policy: settings.fault_policy,
            exit_code: settings.exit_code,
            reconnect_delay: settings.reconnect_delay,
            max_in_flight: settings.max_in_flight,
        };

        let loop_shutdown = shutdown.clone();
        let task = tokio::spawn(
            async move {
                let result = bridge
                    .run(session, mqtt_rx, receiver_rx, loop_shutdown)
                    .await;
                if let Err(e) = &result {
                    error!("Bridge stopped: {}", e);
                }
                result
            }
            .instrument(span),
        );

        info!(
            "Bridge started for {} (fault policy: {})",
            settings.root, settings.fault_policy
        );

        Ok(Self {
            root: settings.root,
            publisher,
            shutdown,
            task: Some(task),
            stopped: false,
        })
    }

    pub fn root(&self) -> &TopicRoot {
        &self.root
    }

    /// Resolves when the event loop ends without being asked to, which only
    /// happens on a fatal fault. Returns immediately once the loop is gone.
    pub async fn wait(&mut self) -> Result<(), BridgeError> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let result = task.await;
        self.task = None;
        result?
    }

    /// Stops the event loop, aborts in-flight submissions and any pending
    /// reconnect, and closes the receiver session. Safe to call repeatedly;
    /// only the first call has an effect.
    pub async fn stop(&mut self) -> Result<(), BridgeError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        info!("Stopping bridge for {}", self.root);
        self.shutdown.cancel();

        let result = match self.task.take() {
            Some(task) => task.await.map_err(BridgeError::from).and_then(|r| r),
            None => Ok(()),
        };

        publish_status(self.publisher.as_ref(), &self.root, OFFLINE).await;
        result
    }
}

/// Where the receiver session is while the loop runs
enum Link {
    Synced(Session<Synced>),
    /// Self-heal in progress; the attempt owns the session until it succeeds
    Healing(BoxFuture<'static, Session<Synced>>),
    /// Closed after a fatal fault
    Closed,
}

struct Bridge {
    root: TopicRoot,
    receiver: Arc<dyn ReceiverClient>,
    state_tx: mpsc::Sender<(String, String)>,
    publish_task: JoinHandle<()>,
    fault_policy: FaultPolicy,
    exit_code: i32,
    reconnect_delay: Duration,
    max_in_flight: usize,
}

impl Bridge {
    async fn run(
        self,
        session: Session<Synced>,
        mut mqtt_rx: mpsc::Receiver<MqttMessage>,
        mut receiver_rx: mpsc::Receiver<ReceiverEvent>,
        shutdown: CancellationToken,
    ) -> Result<(), BridgeError> {
        debug!("Bridge event loop running");
        let mut link = Link::Synced(session);
        let mut in_flight = JoinSet::new();

        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutdown signal received");
                    break Ok(());
                }

                message = mqtt_rx.recv() => match message {
                    Some(message) => self.on_mqtt_message(&link, &mut in_flight, message),
                    None => break Err(BridgeError::MqttChannelClosed),
                },

                event = receiver_rx.recv() => match event {
                    Some(ReceiverEvent::CommandReceived(command)) => {
                        self.on_receiver_event(command);
                    }
                    Some(ReceiverEvent::MessageSent(raw)) => {
                        debug!("Receiver message sent: {}", raw);
                    }
                    Some(ReceiverEvent::MessageReceived(raw)) => {
                        debug!("Receiver message received: {}", raw);
                    }
                    Some(ReceiverEvent::TransportError(cause)) => {
                        link = match std::mem::replace(&mut link, Link::Closed) {
                            Link::Synced(session) => {
                                match self.on_transport_fault(session, cause).await {
                                    Ok(link) => link,
                                    Err(e) => break Err(e),
                                }
                            }
                            other => {
                                debug!("Ignoring transport fault while reconnecting: {}", cause);
                                other
                            }
                        };
                    }
                    None => break Err(BridgeError::ReceiverChannelClosed),
                },

                session = healed(&mut link) => {
                    info!("Receiver connection restored");
                    link = Link::Synced(session);
                }

                Some(joined) = in_flight.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Command submission panicked: {}", e);
                        }
                    }
                }
            }
        };

        if !in_flight.is_empty() {
            debug!("Dropping {} in-flight submissions", in_flight.len());
        }
        in_flight.shutdown().await;

        match link {
            Link::Synced(session) => {
                session.close().await;
            }
            Link::Healing(attempt) => {
                drop(attempt);
                self.receiver.close().await;
            }
            Link::Closed => {}
        }

        drop(self.state_tx);
        let mut publish_task = self.publish_task;
        if tokio::time::timeout(PUBLISH_DRAIN_TIMEOUT, &mut publish_task)
            .await
            .is_err()
        {
            warn!("State publisher did not drain in time, aborting it");
            publish_task.abort();
        }

        result
    }

    /// Decodes an inbound message and submits the command without waiting for it
    fn on_mqtt_message(&self, link: &Link, in_flight: &mut JoinSet<()>, message: MqttMessage) {
        debug!("MQTT message received for topic {}: {}", message.topic, message.payload);

        let Some(command) = self.root.decode(&message.topic, &message.payload) else {
            debug!("No command for topic {}, ignoring", message.topic);
            return;
        };

        let Link::Synced(session) = link else {
            warn!("Receiver not connected, dropping {}", command);
            return;
        };
        if in_flight.len() >= self.max_in_flight {
            warn!(
                "{} submissions already in flight, dropping {}",
                in_flight.len(),
                command
            );
            return;
        }

        let receiver = session.receiver().clone();
        in_flight.spawn(
            async move {
                let description = command.to_string();
                match receiver.send_command(command).await {
                    Ok(()) => debug!("Submitted {}", description),
                    Err(e) => warn!("Failed to submit {}: {}", description, e),
                }
            }
            .in_current_span(),
        );
    }

    /// Queues a receiver state change for publishing
    fn on_receiver_event(&self, command: Command) {
        debug!("Receiver event received: {}", command);

        let topic = self.root.state_topic(&command.control);
        if let Err(e) = self.state_tx.try_send((topic, command.value)) {
            let (topic, _) = e.into_inner();
            warn!("Publish queue unavailable, dropping state for {}", topic);
        }
    }

    async fn on_transport_fault(
        &self,
        session: Session<Synced>,
        cause: ReceiverError,
    ) -> Result<Link, BridgeError> {
        error!(error = ?cause, "Receiver transport error: {}", cause);
        let session = session.close().await;

        match self.fault_policy.action(self.exit_code) {
            FaultAction::Reconnect => {
                let attempt = heal(session, self.reconnect_delay).in_current_span();
                Ok(Link::Healing(attempt.boxed()))
            }
            FaultAction::Escalate => Err(BridgeError::TransportFault(cause)),
            FaultAction::Exit(code) => Err(BridgeError::ExitRequested {
                code,
                source: cause,
            }),
        }
    }
}

/// Resolves with the restored session; pending unless a self-heal is running
async fn healed(link: &mut Link) -> Session<Synced> {
    match link {
        Link::Healing(attempt) => attempt.await,
        _ => std::future::pending().await,
    }
}

/// Reopens and resyncs the receiver until it succeeds, backing off between attempts
async fn heal(mut session: Session<Disconnected>, first_delay: Duration) -> Session<Synced> {
    let mut delay = first_delay;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        info!("Reconnecting to receiver (attempt {})", attempt);

        match session.start().await {
            Ok(session) => return session,
            Err((disconnected, e)) => {
                warn!(
                    "Reconnect attempt {} failed: {}; retrying in {:?}",
                    attempt, e, delay
                );
                session = disconnected;
            }
        }

        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RECONNECT_DELAY);
    }
}

/// Publishes queued state changes in order, retained and at-least-once
async fn publish_states(
    publisher: Arc<dyn StatePublisher>,
    mut states: mpsc::Receiver<(String, String)>,
) {
    while let Some((topic, payload)) = states.recv().await {
        if let Err(e) = publisher
            .publish(topic.clone(), payload, QoS::AtLeastOnce, true)
            .await
        {
            error!("Failed to publish {}: {}", topic, e);
        }
    }
    debug!("State publisher stopped");
}

async fn publish_status(publisher: &dyn StatePublisher, root: &TopicRoot, status: &str) {
    let topic = root.status_topic();
    if let Err(e) = publisher
        .publish(topic.clone(), status.to_string(), QoS::AtLeastOnce, true)
        .await
    {
        warn!("Failed to publish {} to {}: {}", status, topic, e);
    }
}
