//! Error types of the event subsystem.
//!
//! Transport and protocol errors stay inside the socket manager: they are
//! logged and surfaced only as connection state changes. [`SocketError`] is
//! what socket handle methods return to the application.

use ewallet_sdk::objects::{ApiErrorBody, Topic};
use thiserror::Error;

/// The physical connection failed.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid request header: {0}")]
    InvalidHeader(#[from] tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// The peer closed the connection or the stream ended.
    #[error("connection closed")]
    Closed,
}

/// An inbound frame could not be understood. The frame is dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event {event} on {topic} has no payload")]
    MissingPayload { topic: Topic, event: String },
}

/// Errors returned by [`SocketClient`](crate::socket::SocketClient) calls.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The connection dropped before the request was acknowledged.
    #[error("connection lost before acknowledgement")]
    ConnectionLost,

    /// The request was dropped by an explicit disconnect.
    #[error("socket disconnected")]
    Disconnected,

    /// A leave for the same topic was issued while the join was in flight.
    #[error("join of {topic} cancelled by a leave")]
    Cancelled { topic: Topic },

    #[error("server refused to join {topic}: {error}")]
    JoinRejected { topic: Topic, error: ApiErrorBody },

    /// The connection task is gone (all handles dropped or it panicked).
    #[error("socket manager stopped")]
    ManagerStopped,
}
