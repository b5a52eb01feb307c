//! Socket channel management.
//!
//! One [`SocketClient`] owns one physical connection, multiplexing any number
//! of topics over it, and one [`ListenerRegistry`](crate::registry::ListenerRegistry)
//! that receives the decoded events.

mod client;
pub mod connection;
mod manager;
mod state;

pub use client::{SocketClient, SocketClientBuilder};
pub use connection::{Connection, Connector, WebSocketConnector};
pub use state::{ConnectionObserver, ConnectionState, StateChange};
