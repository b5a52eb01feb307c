//! Decoded socket events.
//!
//! An inbound frame is first parsed into an
//! [`InboundEnvelope`](ewallet_sdk::objects::socket::InboundEnvelope) with an
//! opaque payload, then into a [`SocketEvent`] whose payload is typed by the
//! event kind. Events are transient: built per frame, dispatched, dropped.

pub mod types;

pub use ewallet_sdk::objects::socket::SocketEventKind;
pub use types::{EventPayload, SocketEvent};
