//! ChannelManager: the connection task.
//!
//! The ChannelManager is responsible for:
//! - Owning the single physical connection and its state
//! - Joining and leaving topics, tracking membership per topic
//! - Buffering events of a joining topic until its join is acknowledged
//! - Dispatching decoded events to the [`ListenerRegistry`]
//! - Rejoining every remembered topic after each (re)connect, before the
//!   next queued command is processed
//! - Sending heartbeats and, when enabled, reconnecting with backoff
//!
//! It is driven by [`Command`]s from [`SocketClient`](super::SocketClient)
//! handles and stops once every handle is dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use ewallet_sdk::config::{ReconnectPolicy, SocketConfig};
use ewallet_sdk::objects::socket::{InboundEnvelope, OutboundFrame, SocketEventKind};
use ewallet_sdk::objects::{ApiErrorBody, Topic};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::connection::{Connection, Connector};
use super::state::{ConnectionObserver, ConnectionState, StateChange};
use crate::error::{SocketError, TransportError};
use crate::events::SocketEvent;
use crate::registry::ListenerRegistry;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, SocketError>>;

/// Requests from socket handles to the connection task.
pub(crate) enum Command {
    Connect { reply: Reply<()> },
    Disconnect { reply: oneshot::Sender<()> },
    Join { topic: Topic, reply: Reply<()> },
    Leave { topic: Topic, reply: Reply<()> },
    /// Leave `topic` unless a listener is registered on it by the time the
    /// command is processed.
    Release { topic: Topic, reply: Reply<()> },
}

/// Membership of one remembered topic.
#[derive(Debug)]
enum Membership {
    /// `phx_join` sent under `reference`, no reply yet.
    Joining {
        reference: String,
        buffered: VecDeque<SocketEvent>,
    },
    Joined,
    /// Not joined on the current connection; joined again on the next one.
    Detached,
}

/// A control frame waiting for its `phx_reply`.
enum PendingControl {
    Join(Topic),
    Leave { topic: Topic, reply: Reply<()> },
}

struct ReconnectSchedule {
    attempt: u32,
    at: Instant,
}

pub(crate) struct ChannelManager {
    connector: Arc<dyn Connector>,
    registry: ListenerRegistry,
    connection: Option<Connection>,
    membership: HashMap<Topic, Membership>,
    pending: HashMap<String, PendingControl>,
    join_waiters: HashMap<Topic, Vec<Reply<()>>>,
    next_ref: u64,
    heartbeat_period: Option<std::time::Duration>,
    heartbeat: Option<Interval>,
    reconnect_policy: ReconnectPolicy,
    reconnect: Option<ReconnectSchedule>,
    state_tx: watch::Sender<ConnectionState>,
    observers: Vec<Arc<dyn ConnectionObserver>>,
}

impl ChannelManager {
    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        registry: ListenerRegistry,
        config: &SocketConfig,
        state_tx: watch::Sender<ConnectionState>,
        observers: Vec<Arc<dyn ConnectionObserver>>,
    ) -> Self {
        Self {
            connector,
            registry,
            connection: None,
            membership: HashMap::new(),
            pending: HashMap::new(),
            join_waiters: HashMap::new(),
            next_ref: 0,
            heartbeat_period: config.heartbeat_interval(),
            heartbeat: None,
            reconnect_policy: config.reconnect.clone(),
            reconnect: None,
            state_tx,
            observers,
        }
    }

    /// Run until every command sender is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("ChannelManager started");

        loop {
            let reconnect_at = self.reconnect.as_ref().map(|r| r.at);

            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else {
                        info!("All socket handles dropped");
                        break;
                    };
                    self.handle_command(command).await;
                }

                frame = next_frame(&mut self.connection) => {
                    match frame {
                        Some(Ok(text)) => self.handle_frame(&text),
                        Some(Err(e)) => self.connection_lost(e),
                        None => self.connection_lost(TransportError::Closed),
                    }
                }

                () = next_tick(&mut self.heartbeat) => {
                    let reference = self.make_ref();
                    trace!(reference = %reference, "Sending heartbeat");
                    self.send_or_drop(&OutboundFrame::heartbeat(reference)).await;
                }

                () = sleep_until(reconnect_at) => {
                    self.attempt_reconnect().await;
                }
            }
        }

        self.shutdown().await;
        info!("ChannelManager shutdown complete");
    }

    // -- Commands -----------------------------------------------------------

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { reply } => {
                // Explicit connects reset any scheduled retry.
                self.reconnect = None;
                let _ = reply.send(self.connect().await);
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Join { topic, reply } => self.join(topic, reply).await,
            Command::Leave { topic, reply } => self.leave(topic, reply).await,
            Command::Release { topic, reply } => {
                if self.registry.has_listeners(&topic) {
                    debug!(topic = %topic, "Topic has listeners again, staying joined");
                    let _ = reply.send(Ok(()));
                } else {
                    self.leave(topic, reply).await;
                }
            }
        }
    }

    async fn connect(&mut self) -> Result<(), SocketError> {
        if self.connection.is_some() {
            return Ok(());
        }

        self.transition(ConnectionState::Connecting, None);
        let connection = match self.connector.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(error = %e, "Socket connect failed");
                self.transition(ConnectionState::Disconnected, Some(&e));
                return Err(e.into());
            }
        };

        self.connection = Some(connection);
        self.heartbeat = self.heartbeat_period.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        self.transition(ConnectionState::Connected, None);
        self.rejoin_all().await;

        if self.connection.is_some() {
            Ok(())
        } else {
            Err(SocketError::ConnectionLost)
        }
    }

    /// Send `phx_join` for every remembered topic.
    async fn rejoin_all(&mut self) {
        let mut topics: Vec<Topic> = self
            .membership
            .iter()
            .filter(|(_, m)| matches!(m, Membership::Detached))
            .map(|(topic, _)| topic.clone())
            .collect();
        topics.sort();

        if !topics.is_empty() {
            info!(count = topics.len(), "Rejoining topics");
        }
        for topic in topics {
            if !self.send_join(topic).await {
                return;
            }
        }
    }

    async fn disconnect(&mut self) {
        self.reconnect = None;
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        if let Err(e) = connection.sink.close().await {
            debug!(error = %e, "Error while closing socket");
        }
        self.detach_all(|| SocketError::Disconnected);
        self.transition(ConnectionState::Disconnected, None);
    }

    async fn join(&mut self, topic: Topic, reply: Reply<()>) {
        match self.membership.get(&topic) {
            Some(Membership::Joined) => {
                let _ = reply.send(Ok(()));
                return;
            }
            Some(Membership::Joining { .. }) => {
                self.join_waiters.entry(topic).or_default().push(reply);
                return;
            }
            Some(Membership::Detached) | None => {}
        }

        if self.connection.is_none() {
            // Remembered; joined on the next connect.
            debug!(topic = %topic, "Not connected, join deferred");
            self.membership.insert(topic, Membership::Detached);
            let _ = reply.send(Ok(()));
            return;
        }

        self.join_waiters.entry(topic.clone()).or_default().push(reply);
        self.send_join(topic).await;
    }

    /// Returns `false` if the connection was lost while sending.
    async fn send_join(&mut self, topic: Topic) -> bool {
        let reference = self.make_ref();
        debug!(topic = %topic, reference = %reference, "Joining topic");
        self.pending
            .insert(reference.clone(), PendingControl::Join(topic.clone()));
        self.membership.insert(
            topic.clone(),
            Membership::Joining {
                reference: reference.clone(),
                buffered: VecDeque::new(),
            },
        );
        self.send_or_drop(&OutboundFrame::join(topic, reference))
            .await
    }

    async fn leave(&mut self, topic: Topic, reply: Reply<()>) {
        let Some(membership) = self.membership.remove(&topic) else {
            let _ = reply.send(Ok(()));
            return;
        };

        if let Some(waiters) = self.join_waiters.remove(&topic) {
            for waiter in waiters {
                let _ = waiter.send(Err(SocketError::Cancelled {
                    topic: topic.clone(),
                }));
            }
        }

        if self.connection.is_none() || matches!(membership, Membership::Detached) {
            let _ = reply.send(Ok(()));
            return;
        }

        let reference = self.make_ref();
        debug!(topic = %topic, reference = %reference, "Leaving topic");
        self.pending.insert(
            reference.clone(),
            PendingControl::Leave {
                topic: topic.clone(),
                reply,
            },
        );
        self.send_or_drop(&OutboundFrame::leave(topic, reference))
            .await;
    }

    // -- Inbound frames -----------------------------------------------------

    fn handle_frame(&mut self, text: &str) {
        let envelope: InboundEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return;
            }
        };

        if envelope.event == SocketEventKind::Reply {
            self.handle_reply(envelope);
            return;
        }
        if envelope.event.is_control() {
            trace!(topic = %envelope.topic, event = %envelope.event, "Ignoring inbound control frame");
            return;
        }

        let event = match SocketEvent::from_envelope(envelope) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable event");
                return;
            }
        };

        if let Some(Membership::Joining { buffered, .. }) = self.membership.get_mut(&event.topic) {
            trace!(topic = %event.topic, event = %event.kind, "Buffering event until join completes");
            buffered.push_back(event);
            return;
        }

        let handled = self.registry.dispatch(&event);
        debug!(topic = %event.topic, event = %event.kind, handled, "Event dispatched");
    }

    fn handle_reply(&mut self, envelope: InboundEnvelope) {
        let control = envelope
            .reference
            .as_ref()
            .and_then(|reference| self.pending.remove(reference));

        let Some(control) = control else {
            if envelope.topic.name() == Topic::HEARTBEAT {
                trace!("Heartbeat acknowledged");
            } else {
                debug!(topic = %envelope.topic, reference = ?envelope.reference, "Unmatched reply dropped");
            }
            return;
        };

        match control {
            PendingControl::Join(topic) => {
                let reference = envelope.reference.unwrap_or_default();
                self.complete_join(topic, &reference, envelope.success, envelope.error);
            }
            PendingControl::Leave { topic, reply } => {
                if !envelope.success {
                    debug!(topic = %topic, "Server refused leave; treating topic as left");
                }
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn complete_join(
        &mut self,
        topic: Topic,
        reference: &str,
        success: bool,
        error: Option<ApiErrorBody>,
    ) {
        let buffered = match self.membership.get_mut(&topic) {
            Some(Membership::Joining {
                reference: expected,
                buffered,
            }) if expected.as_str() == reference => std::mem::take(buffered),
            _ => {
                debug!(topic = %topic, reference, "Stale join reply dropped");
                return;
            }
        };
        let waiters = self.join_waiters.remove(&topic).unwrap_or_default();

        if success {
            self.membership.insert(topic.clone(), Membership::Joined);
            debug!(topic = %topic, buffered = buffered.len(), "Topic joined");
            for waiter in waiters {
                let _ = waiter.send(Ok(()));
            }
            for event in buffered {
                self.registry.dispatch(&event);
            }
            return;
        }

        self.membership.remove(&topic);
        let error = error.unwrap_or_else(|| ApiErrorBody::new("join_refused", "join refused"));
        warn!(topic = %topic, code = %error.code, "Server refused join");
        // Listeners hear about it before the waiters can roll back.
        self.registry
            .dispatch(&SocketEvent::error(topic.clone(), error.clone()));
        for waiter in waiters {
            let _ = waiter.send(Err(SocketError::JoinRejected {
                topic: topic.clone(),
                error: error.clone(),
            }));
        }
    }

    // -- Connection loss and reconnect ----------------------------------------

    fn connection_lost(&mut self, error: TransportError) {
        if self.connection.take().is_none() {
            return;
        }
        warn!(error = %error, "Socket connection lost");
        self.detach_all(|| SocketError::ConnectionLost);
        self.transition(ConnectionState::Disconnected, Some(&error));
        self.schedule_reconnect(0);
    }

    /// Forget everything tied to the current connection but keep the topics.
    fn detach_all(&mut self, failure: impl Fn() -> SocketError) {
        self.heartbeat = None;
        for membership in self.membership.values_mut() {
            *membership = Membership::Detached;
        }
        for (_, control) in self.pending.drain() {
            // Leaving is complete once the connection is gone.
            if let PendingControl::Leave { reply, .. } = control {
                let _ = reply.send(Ok(()));
            }
        }
        for (_, waiters) in self.join_waiters.drain() {
            for waiter in waiters {
                let _ = waiter.send(Err(failure()));
            }
        }
    }

    fn schedule_reconnect(&mut self, attempt: u32) {
        if !self.reconnect_policy.allows(attempt) {
            if self.reconnect_policy.enabled {
                warn!(attempt, "Giving up on reconnecting");
            }
            return;
        }
        let delay = self.reconnect_policy.delay_for(attempt);
        info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");
        self.reconnect = Some(ReconnectSchedule {
            attempt,
            at: Instant::now() + delay,
        });
    }

    async fn attempt_reconnect(&mut self) {
        let Some(schedule) = self.reconnect.take() else {
            return;
        };
        if let Err(e) = self.connect().await {
            debug!(attempt = schedule.attempt, error = %e, "Reconnect attempt failed");
            self.schedule_reconnect(schedule.attempt + 1);
        }
    }

    async fn shutdown(&mut self) {
        self.disconnect().await;
        for (_, waiters) in self.join_waiters.drain() {
            for waiter in waiters {
                let _ = waiter.send(Err(SocketError::ManagerStopped));
            }
        }
    }

    // -- Helpers ------------------------------------------------------------

    /// Send one frame. On failure the connection is dropped and `false` is
    /// returned.
    async fn send_or_drop(&mut self, frame: &OutboundFrame) -> bool {
        let Some(connection) = self.connection.as_mut() else {
            return false;
        };
        let result = match serde_json::to_string(frame) {
            Ok(text) => connection.sink.send(text).await,
            Err(e) => Err(TransportError::from(e)),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                self.connection_lost(e);
                false
            }
        }
    }

    fn make_ref(&mut self) -> String {
        self.next_ref += 1;
        self.next_ref.to_string()
    }

    fn transition(&mut self, next: ConnectionState, error: Option<&TransportError>) {
        let previous = *self.state_tx.borrow();
        if previous == next {
            return;
        }
        self.state_tx.send_replace(next);
        info!(from = %previous, to = %next, "Socket state changed");

        let change = StateChange {
            previous,
            current: next,
            error,
        };
        for observer in &self.observers {
            observer.on_state_change(change);
        }
    }
}

async fn next_frame(connection: &mut Option<Connection>) -> Option<Result<String, TransportError>> {
    match connection {
        Some(connection) => connection.stream.next().await,
        None => std::future::pending().await,
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
