//! Websocket frame types for the event socket.
//!
//! The socket speaks Phoenix-style JSON text frames. Every frame is scoped to
//! a topic and carries an event name:
//!
//! ```json
//! {"topic":"transaction_consumption:txc_01","event":"phx_join","ref":"1","data":{}}
//! {"topic":"transaction_consumption:txc_01","event":"phx_reply","ref":"1","success":true,"data":{}}
//! {"topic":"transaction_consumption:txc_01","event":"transaction_consumption_finalized","success":true,"data":{ ... }}
//! ```
//!
//! # Protocol
//!
//! 1. The client sends `phx_join` with a fresh `ref` for each topic.
//! 2. The server answers with `phx_reply` carrying the same `ref`
//!    (`success: false` plus `error` when the join is refused).
//! 3. Domain events for the topic follow, with no `ref`.
//! 4. `phx_leave` is acknowledged the same way as `phx_join`.
//! 5. The client sends `heartbeat` on topic `phoenix` periodically.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use super::error::ApiErrorBody;
use super::topic::Topic;

/// Kind of a socket event, decoded from its wire string.
///
/// Unrecognized strings become [`SocketEventKind::Unknown`] carrying the raw
/// value; decoding never fails on the event name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CompactString", into = "CompactString")]
pub enum SocketEventKind {
    Join,
    Leave,
    Reply,
    ChannelError,
    ChannelClosed,
    Heartbeat,
    /// Someone consumed a transaction request (request topic).
    ConsumptionRequest,
    ConsumptionApproved,
    ConsumptionRejected,
    /// A consumption settled (confirmed, failed or rejected).
    ConsumptionFinalized,
    ConsumptionExpired,
    Unknown(CompactString),
}

/// Wire string to event kind lookup table.
const EVENT_KINDS: &[(&str, SocketEventKind)] = &[
    ("phx_join", SocketEventKind::Join),
    ("phx_leave", SocketEventKind::Leave),
    ("phx_reply", SocketEventKind::Reply),
    ("phx_error", SocketEventKind::ChannelError),
    ("phx_close", SocketEventKind::ChannelClosed),
    ("heartbeat", SocketEventKind::Heartbeat),
    (
        "transaction_consumption_request",
        SocketEventKind::ConsumptionRequest,
    ),
    (
        "transaction_consumption_approved",
        SocketEventKind::ConsumptionApproved,
    ),
    (
        "transaction_consumption_rejected",
        SocketEventKind::ConsumptionRejected,
    ),
    (
        "transaction_consumption_finalized",
        SocketEventKind::ConsumptionFinalized,
    ),
    (
        "transaction_consumption_expired",
        SocketEventKind::ConsumptionExpired,
    ),
];

impl SocketEventKind {
    /// Look up the kind for a wire string.
    pub fn from_wire(raw: &str) -> Self {
        EVENT_KINDS
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, kind)| kind.clone())
            .unwrap_or_else(|| Self::Unknown(CompactString::from(raw)))
    }

    /// The wire string for this kind.
    pub fn as_wire(&self) -> &str {
        if let Self::Unknown(raw) = self {
            return raw;
        }
        EVENT_KINDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }

    /// Returns `true` for the join/leave/reply/heartbeat control kinds.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::Join | Self::Leave | Self::Reply | Self::Heartbeat
        )
    }

    /// Returns `true` for kinds whose `data` is a transaction consumption.
    pub fn carries_consumption(&self) -> bool {
        matches!(
            self,
            Self::ConsumptionRequest
                | Self::ConsumptionApproved
                | Self::ConsumptionRejected
                | Self::ConsumptionFinalized
                | Self::ConsumptionExpired
        )
    }
}

impl From<CompactString> for SocketEventKind {
    fn from(raw: CompactString) -> Self {
        Self::from_wire(&raw)
    }
}

impl From<SocketEventKind> for CompactString {
    fn from(kind: SocketEventKind) -> Self {
        CompactString::from(kind.as_wire())
    }
}

impl std::fmt::Display for SocketEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Client-to-server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub topic: Topic,
    pub event: SocketEventKind,
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl OutboundFrame {
    pub fn join(topic: Topic, reference: impl Into<String>) -> Self {
        Self::control(topic, SocketEventKind::Join, reference)
    }

    pub fn leave(topic: Topic, reference: impl Into<String>) -> Self {
        Self::control(topic, SocketEventKind::Leave, reference)
    }

    pub fn heartbeat(reference: impl Into<String>) -> Self {
        Self::control(
            Topic::new(Topic::HEARTBEAT),
            SocketEventKind::Heartbeat,
            reference,
        )
    }

    fn control(topic: Topic, event: SocketEventKind, reference: impl Into<String>) -> Self {
        Self {
            topic,
            event,
            reference: reference.into(),
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Server-to-client frame, decoded but with its payload still opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEnvelope {
    pub topic: Topic,
    pub event: SocketEventKind,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

fn default_success() -> bool {
    true
}
