//! Event type definitions.

use ewallet_sdk::objects::socket::{InboundEnvelope, SocketEventKind};
use ewallet_sdk::objects::{ApiErrorBody, Topic, TransactionConsumption};

use crate::error::ProtocolError;

/// Payload of a socket event, typed by its kind.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// A consumption snapshot, for the `transaction_consumption_*` kinds.
    Consumption(Box<TransactionConsumption>),
    /// Any other payload, left as JSON.
    Raw(serde_json::Value),
    Empty,
}

/// One decoded inbound event.
#[derive(Debug, Clone)]
pub struct SocketEvent {
    pub topic: Topic,
    pub kind: SocketEventKind,
    pub payload: EventPayload,
    /// Set when the server flagged the event as failed (`"success": false`)
    /// or for channel errors.
    pub error: Option<ApiErrorBody>,
}

impl SocketEvent {
    /// Parse a raw text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: InboundEnvelope = serde_json::from_str(text)?;
        Self::from_envelope(envelope)
    }

    /// Type the payload of an already parsed envelope.
    ///
    /// A consumption kind must carry a decodable consumption unless the
    /// event is flagged as failed, in which case the error alone is enough.
    pub fn from_envelope(envelope: InboundEnvelope) -> Result<Self, ProtocolError> {
        let InboundEnvelope {
            topic,
            event: kind,
            data,
            success,
            error,
            ..
        } = envelope;

        let error = match (success, error, &kind) {
            (_, Some(error), _) => Some(error),
            (false, None, _) => Some(ApiErrorBody::new("unknown_error", "event reported failure")),
            (true, None, SocketEventKind::ChannelError) => {
                Some(ApiErrorBody::new("channel_error", "channel crashed on the server"))
            }
            (true, None, _) => None,
        };

        let data = data.filter(|value| !value.is_null());
        let payload = match data {
            Some(data) if kind.carries_consumption() => match serde_json::from_value(data) {
                Ok(consumption) => EventPayload::Consumption(Box::new(consumption)),
                Err(_) if error.is_some() => EventPayload::Empty,
                Err(e) => return Err(e.into()),
            },
            Some(data) => EventPayload::Raw(data),
            None if kind.carries_consumption() && error.is_none() => {
                return Err(ProtocolError::MissingPayload {
                    topic,
                    event: kind.to_string(),
                });
            }
            None => EventPayload::Empty,
        };

        Ok(Self {
            topic,
            kind,
            payload,
            error,
        })
    }

    /// A locally raised error event for `topic`.
    pub fn error(topic: Topic, error: ApiErrorBody) -> Self {
        Self {
            topic,
            kind: SocketEventKind::ChannelError,
            payload: EventPayload::Empty,
            error: Some(error),
        }
    }

    pub fn consumption(&self) -> Option<&TransactionConsumption> {
        match &self.payload {
            EventPayload::Consumption(consumption) => Some(consumption),
            _ => None,
        }
    }
}
