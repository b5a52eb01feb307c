#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ewallet_core::TransportError;
use ewallet_core::socket::{Connection, Connector};
use ewallet_sdk::config::SocketConfig;
use ewallet_sdk::objects::socket::{OutboundFrame, SocketEventKind};
use ewallet_sdk::objects::TransactionConsumption;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

const TIMEOUT: Duration = Duration::from_secs(2);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Socket config for tests: no heartbeats, no automatic reconnect.
pub fn quiet_config() -> SocketConfig {
    SocketConfig {
        heartbeat_interval_secs: 0,
        ..SocketConfig::default()
    }
}

// ---------------------------------------------------------------------------
// In-memory server
// ---------------------------------------------------------------------------

/// Connector handing every new connection's server side to a [`MockServer`].
pub struct MockConnector {
    accepted: mpsc::UnboundedSender<ServerConnection>,
    refuse: Arc<AtomicBool>,
}

pub struct MockServer {
    accepted: mpsc::UnboundedReceiver<ServerConnection>,
    refuse: Arc<AtomicBool>,
}

pub fn mock_server() -> (MockConnector, MockServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let refuse = Arc::new(AtomicBool::new(false));
    (
        MockConnector {
            accepted: tx,
            refuse: refuse.clone(),
        },
        MockServer {
            accepted: rx,
            refuse,
        },
    )
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let (client_tx, server_rx) = mpsc::unbounded_channel::<String>();
        let (server_tx, client_rx) = mpsc::unbounded_channel::<Result<String, TransportError>>();

        let sink = futures_util::sink::unfold(client_tx, |tx, frame: String| async move {
            tx.send(frame).map_err(|_| TransportError::Closed)?;
            Ok::<_, TransportError>(tx)
        });
        let stream = UnboundedReceiverStream::new(client_rx);

        self.accepted
            .send(ServerConnection {
                received: server_rx,
                outgoing: server_tx,
            })
            .map_err(|_| TransportError::Closed)?;
        Ok(Connection::new(sink, stream))
    }
}

impl MockServer {
    pub async fn accept(&mut self) -> ServerConnection {
        tokio::time::timeout(TIMEOUT, self.accepted.recv())
            .await
            .expect("no connection within timeout")
            .expect("connector dropped")
    }

    /// Make subsequent connection attempts fail.
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

/// Server side of one mock connection.
pub struct ServerConnection {
    received: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<Result<String, TransportError>>,
}

impl ServerConnection {
    /// Next frame sent by the client.
    pub async fn recv(&mut self) -> OutboundFrame {
        let text = tokio::time::timeout(TIMEOUT, self.received.recv())
            .await
            .expect("no frame within timeout")
            .expect("client closed the connection");
        serde_json::from_str(&text).expect("client sent an invalid frame")
    }

    /// Returns `true` if no frame is waiting.
    pub fn is_idle(&mut self) -> bool {
        self.received.try_recv().is_err()
    }

    pub fn push_raw(&self, text: impl Into<String>) {
        let _ = self.outgoing.send(Ok(text.into()));
    }

    pub fn push(&self, frame: Value) {
        self.push_raw(frame.to_string());
    }

    pub fn reply_ok(&self, frame: &OutboundFrame) {
        self.push(json!({
            "topic": frame.topic,
            "event": "phx_reply",
            "ref": frame.reference,
            "success": true,
            "data": {}
        }));
    }

    pub fn reply_error(&self, frame: &OutboundFrame, code: &str, description: &str) {
        self.push(json!({
            "topic": frame.topic,
            "event": "phx_reply",
            "ref": frame.reference,
            "success": false,
            "data": null,
            "error": {"code": code, "description": description}
        }));
    }

    pub fn event(&self, topic: &str, event: &str, data: Value) {
        self.push(json!({"topic": topic, "event": event, "success": true, "data": data}));
    }

    /// Receive one join and acknowledge it.
    pub async fn accept_join(&mut self) -> OutboundFrame {
        let frame = self.recv().await;
        assert_eq!(frame.event, SocketEventKind::Join, "expected a join, got {frame:?}");
        self.reply_ok(&frame);
        frame
    }

    /// Simulate a network failure.
    pub fn fail(self) {
        let _ = self.outgoing.send(Err(TransportError::Closed));
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn consumption_json(id: &str, status: &str, extra: Value) -> Value {
    let mut value = json!({
        "id": id,
        "status": status,
        "amount": null,
        "estimated_request_amount": "100.00",
        "estimated_consumption_amount": "100.00",
        "token": {"id": "tok_OMG", "symbol": "OMG", "name": "OmiseGO", "subunit_to_unit": 100},
        "address": "addr_01",
        "transaction_request_id": "txr_01",
        "socket_topic": format!("transaction_consumption:{id}"),
        "created_at": "2018-05-01T10:00:00Z"
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    value
}

pub fn consumption(id: &str, status: &str, extra: Value) -> TransactionConsumption {
    serde_json::from_value(consumption_json(id, status, extra)).expect("valid consumption fixture")
}

pub fn topic_of(id: &str) -> String {
    format!("transaction_consumption:{id}")
}

/// Wait until `condition` holds, polling the runtime in between.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}
