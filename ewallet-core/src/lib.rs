//! Real-time event subsystem of the eWallet client SDK.
//!
//! - [`socket`]: one physical connection multiplexing many topics
//! - [`registry`]: which listeners receive which topic's events
//! - [`listeners`]: the callback capability sets
//! - [`consumption`]: the transaction consumption state machine

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod consumption;
pub mod error;
pub mod events;
pub mod listeners;
pub mod registry;
pub mod socket;

pub use consumption::ConsumptionTracker;
pub use error::{ProtocolError, SocketError, TransportError};
pub use events::SocketEvent;
pub use listeners::{
    Listenable, Listener, SocketEventListener, TransactionConsumptionListener,
    TransactionRequestListener,
};
pub use registry::{ListenerRegistry, SubscriptionHandle};
pub use socket::{ConnectionObserver, ConnectionState, SocketClient, StateChange};
