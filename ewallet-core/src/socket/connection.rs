//! Physical connection abstraction.
//!
//! The channel manager only needs a sink of text frames and a stream of text
//! frames. [`Connector`] hides how they are obtained, so tests can plug in an
//! in-memory server while production uses [`WebSocketConnector`].

use std::pin::Pin;

use async_trait::async_trait;
use ewallet_sdk::auth::{ACCEPT_MEDIA_TYPE, ClientCredentials};
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, info};

use crate::error::TransportError;

pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One open connection, split into its two halves.
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Connection {
    pub fn new<Si, St>(sink: Si, stream: St) -> Self
    where
        Si: Sink<String, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<String, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens physical connections for the channel manager.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Connection, TransportError>;
}

/// Connects to the eWallet websocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
    credentials: ClientCredentials,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, credentials: ClientCredentials) -> Self {
        Self {
            url: url.into(),
            credentials,
        }
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let mut request = self.url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&self.credentials.to_header())?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MEDIA_TYPE));

        let (socket, response) = tokio_tungstenite::connect_async(request).await?;
        info!(url = %self.url, status = %response.status(), "Websocket connected");

        let (sink, stream) = socket.split();
        let sink = sink
            .sink_map_err(TransportError::from)
            .with(|text: String| future::ready(Ok::<_, TransportError>(Message::text(text))));
        let stream = stream.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.to_string())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Websocket close frame received");
                    Some(Err(TransportError::Closed))
                }
                // Ping/pong are answered by tungstenite; binary frames are not
                // part of the protocol.
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::from(e))),
            })
        });

        Ok(Connection::new(sink, stream))
    }
}
