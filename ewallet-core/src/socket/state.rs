//! Connection state and the state-change hook.

use std::fmt;

use crate::error::TransportError;

/// State of the physical socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// One state transition, as seen by a [`ConnectionObserver`].
#[derive(Debug, Clone, Copy)]
pub struct StateChange<'a> {
    pub previous: ConnectionState,
    pub current: ConnectionState,
    /// The transport failure that caused the transition, if any.
    pub error: Option<&'a TransportError>,
}

/// Hook invoked on every connection state transition.
///
/// Runs on the connection task; it must return quickly. Typical uses are
/// updating a UI indicator or scheduling a custom reconnect through a
/// [`SocketClient`](super::SocketClient) clone.
pub trait ConnectionObserver: Send + Sync {
    fn on_state_change(&self, change: StateChange<'_>);
}

impl<F> ConnectionObserver for F
where
    F: for<'a> Fn(StateChange<'a>) + Send + Sync,
{
    fn on_state_change(&self, change: StateChange<'_>) {
        self(change)
    }
}
