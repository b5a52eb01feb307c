//! Application-facing socket handle.

use std::sync::Arc;

use ewallet_sdk::config::{ClientConfig, SocketConfig};
use ewallet_sdk::objects::Topic;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use super::connection::{Connector, WebSocketConnector};
use super::manager::{ChannelManager, Command};
use super::state::{ConnectionObserver, ConnectionState};
use crate::error::SocketError;
use crate::listeners::{Listenable, Listener};
use crate::registry::{ListenerRegistry, SubscriptionHandle};

/// Builder for a [`SocketClient`] and its connection task.
pub struct SocketClientBuilder {
    connector: Arc<dyn Connector>,
    config: SocketConfig,
    observers: Vec<Arc<dyn ConnectionObserver>>,
}

impl SocketClientBuilder {
    pub fn new(connector: impl Connector) -> Self {
        Self {
            connector: Arc::new(connector),
            config: SocketConfig::default(),
            observers: Vec::new(),
        }
    }

    pub fn config(mut self, config: SocketConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a hook called on every connection state transition.
    pub fn observer(mut self, observer: impl ConnectionObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Spawn the connection task on the current tokio runtime.
    ///
    /// The client starts disconnected; call [`SocketClient::connect`].
    pub fn spawn(self) -> SocketClient {
        let (commands_tx, commands_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let registry = ListenerRegistry::new();

        let manager = ChannelManager::new(
            self.connector,
            registry.clone(),
            &self.config,
            state_tx,
            self.observers,
        );
        tokio::spawn(manager.run(commands_rx));

        SocketClient {
            commands: commands_tx,
            registry,
            state: state_rx,
        }
    }
}

/// Handle to one socket connection and its listener registry.
///
/// Cheap to clone; every clone talks to the same connection task. The task
/// stops when the last clone is dropped.
#[derive(Clone)]
pub struct SocketClient {
    commands: mpsc::Sender<Command>,
    registry: ListenerRegistry,
    state: watch::Receiver<ConnectionState>,
}

impl SocketClient {
    pub fn builder(connector: impl Connector) -> SocketClientBuilder {
        SocketClientBuilder::new(connector)
    }

    /// Websocket client for `config.socket_url`, authenticated with the
    /// configured credentials.
    pub fn from_config(config: &ClientConfig) -> SocketClient {
        let connector = WebSocketConnector::new(config.socket_url.as_str(), config.credentials());
        SocketClientBuilder::new(connector)
            .config(config.socket.clone())
            .spawn()
    }

    /// Open the connection. Remembered topics are rejoined before this
    /// returns and before any later command is processed.
    pub async fn connect(&self) -> Result<(), SocketError> {
        self.request(|reply| Command::Connect { reply }).await
    }

    /// Close the connection. Topics stay remembered for the next connect.
    pub async fn disconnect(&self) -> Result<(), SocketError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Disconnect { reply }).await?;
        rx.await.map_err(|_| SocketError::ManagerStopped)
    }

    /// Join `topic`.
    ///
    /// Resolves once the server acknowledged the join. While disconnected the
    /// topic is only remembered and this resolves immediately; the join is
    /// sent on the next connect.
    pub async fn join_topic(&self, topic: &Topic) -> Result<(), SocketError> {
        let topic = topic.clone();
        self.request(|reply| Command::Join { topic, reply }).await
    }

    /// Leave `topic`. Listeners stay registered but receive nothing more.
    pub async fn leave_topic(&self, topic: &Topic) -> Result<(), SocketError> {
        let topic = topic.clone();
        self.request(|reply| Command::Leave { topic, reply }).await
    }

    /// Register `listener` on `topic` and join it.
    ///
    /// If the join fails a registration created by this call is rolled back.
    /// Subscribing a listener that is already registered never removes it.
    pub async fn subscribe(
        &self,
        topic: Topic,
        listener: impl Into<Listener>,
    ) -> Result<SubscriptionHandle, SocketError> {
        let (handle, created) = self.registry.register(topic, listener);
        match self.join_topic(handle.topic()).await {
            Ok(()) => Ok(handle),
            Err(e) if created => {
                debug!(topic = %handle.topic(), error = %e, "Join failed, rolling back subscription");
                self.registry.unsubscribe(&handle);
                let _ = self.release_topic(handle.topic()).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Subscribe `listener` to the topic owned by `entity`.
    pub async fn listen<T: Listenable>(
        &self,
        entity: &T,
        listener: Arc<T::Listener>,
    ) -> Result<SubscriptionHandle, SocketError> {
        self.subscribe(entity.socket_topic().clone(), T::wrap_listener(listener))
            .await
    }

    /// Remove one registration, leaving the topic when it was the last.
    ///
    /// Returns `Ok(false)` if the handle was already unsubscribed.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<bool, SocketError> {
        if !self.registry.unsubscribe(handle) {
            return Ok(false);
        }
        self.release_topic(handle.topic()).await?;
        Ok(true)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change from now on.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    /// Leave `topic` if it has no listeners once the connection task gets
    /// to it. A concurrent subscribe on another handle keeps it joined.
    async fn release_topic(&self, topic: &Topic) -> Result<(), SocketError> {
        let topic = topic.clone();
        self.request(|reply| Command::Release { topic, reply }).await
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<(), SocketError>>) -> Command,
    ) -> Result<(), SocketError> {
        let (reply, rx) = oneshot::channel();
        self.send(command(reply)).await?;
        rx.await.map_err(|_| SocketError::ManagerStopped)?
    }

    async fn send(&self, command: Command) -> Result<(), SocketError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SocketError::ManagerStopped)
    }
}

impl std::fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketClient")
            .field("state", &self.state())
            .field("registry", &self.registry)
            .finish()
    }
}
