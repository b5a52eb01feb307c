//! Listener capability sets.
//!
//! Each listenable domain type has one trait with a callback slot per event
//! kind it can receive. Every slot has a no-op default, so an implementor
//! only overrides what it cares about. Events no slot covers go to
//! `on_unhandled_event`, which reports whether it dealt with them.
//!
//! Callbacks run on the socket's receive task: they must not block. They
//! may call back into the [`ListenerRegistry`](crate::registry::ListenerRegistry),
//! including unsubscribing themselves.

use std::sync::Arc;

use ewallet_sdk::objects::{ApiErrorBody, Topic, TransactionConsumption, TransactionRequest};

use crate::events::{SocketEvent, SocketEventKind};

/// Callbacks for the topic of one transaction consumption.
pub trait TransactionConsumptionListener: Send + Sync {
    fn on_consumption_approved(&self, _consumption: &TransactionConsumption) {}

    fn on_consumption_rejected(&self, _consumption: &TransactionConsumption) {}

    fn on_consumption_finalized(&self, _consumption: &TransactionConsumption) {}

    fn on_consumption_expired(&self, _consumption: &TransactionConsumption) {}

    fn on_error(&self, _error: &ApiErrorBody) {}

    fn on_unhandled_event(&self, _event: &SocketEvent) -> bool {
        false
    }
}

/// Callbacks for the topic of one transaction request.
pub trait TransactionRequestListener: Send + Sync {
    /// Someone consumed the request; the consumption may need approval.
    fn on_consumption_request(&self, _consumption: &TransactionConsumption) {}

    fn on_consumption_finalized(&self, _consumption: &TransactionConsumption) {}

    fn on_error(&self, _error: &ApiErrorBody) {}

    fn on_unhandled_event(&self, _event: &SocketEvent) -> bool {
        false
    }
}

/// Catch-all listener receiving every event of its topic as is.
pub trait SocketEventListener: Send + Sync {
    fn on_event(&self, event: &SocketEvent);
}

impl<F> SocketEventListener for F
where
    F: Fn(&SocketEvent) + Send + Sync,
{
    fn on_event(&self, event: &SocketEvent) {
        self(event)
    }
}

/// A listener, tagged with the capability set chosen at registration.
#[derive(Clone)]
pub enum Listener {
    Consumption(Arc<dyn TransactionConsumptionListener>),
    Request(Arc<dyn TransactionRequestListener>),
    Event(Arc<dyn SocketEventListener>),
}

/// What a listener did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Handled,
    Unhandled,
}

impl Listener {
    /// Identity of the underlying listener object: capability tag plus the
    /// address of the shared allocation.
    pub(crate) fn identity(&self) -> (u8, usize) {
        match self {
            Listener::Consumption(l) => (0, Arc::as_ptr(l) as *const () as usize),
            Listener::Request(l) => (1, Arc::as_ptr(l) as *const () as usize),
            Listener::Event(l) => (2, Arc::as_ptr(l) as *const () as usize),
        }
    }

    /// Invoke the slot matching `event`.
    pub fn deliver(&self, event: &SocketEvent) -> Delivery {
        let handled = match self {
            Listener::Consumption(listener) => deliver_to_consumption(listener.as_ref(), event),
            Listener::Request(listener) => deliver_to_request(listener.as_ref(), event),
            Listener::Event(listener) => {
                listener.on_event(event);
                true
            }
        };
        if handled {
            Delivery::Handled
        } else {
            Delivery::Unhandled
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (tag, address) = self.identity();
        let name = match tag {
            0 => "Consumption",
            1 => "Request",
            _ => "Event",
        };
        write!(f, "Listener::{name}({address:#x})")
    }
}

impl From<Arc<dyn TransactionConsumptionListener>> for Listener {
    fn from(listener: Arc<dyn TransactionConsumptionListener>) -> Self {
        Listener::Consumption(listener)
    }
}

impl From<Arc<dyn TransactionRequestListener>> for Listener {
    fn from(listener: Arc<dyn TransactionRequestListener>) -> Self {
        Listener::Request(listener)
    }
}

impl From<Arc<dyn SocketEventListener>> for Listener {
    fn from(listener: Arc<dyn SocketEventListener>) -> Self {
        Listener::Event(listener)
    }
}

fn deliver_to_consumption(listener: &dyn TransactionConsumptionListener, event: &SocketEvent) -> bool {
    let Some(consumption) = event.consumption() else {
        if let Some(error) = &event.error {
            listener.on_error(error);
            return true;
        }
        return listener.on_unhandled_event(event);
    };

    match event.kind {
        SocketEventKind::ConsumptionApproved => listener.on_consumption_approved(consumption),
        SocketEventKind::ConsumptionRejected => listener.on_consumption_rejected(consumption),
        SocketEventKind::ConsumptionFinalized => listener.on_consumption_finalized(consumption),
        SocketEventKind::ConsumptionExpired => listener.on_consumption_expired(consumption),
        _ => return listener.on_unhandled_event(event),
    }
    true
}

fn deliver_to_request(listener: &dyn TransactionRequestListener, event: &SocketEvent) -> bool {
    let Some(consumption) = event.consumption() else {
        if let Some(error) = &event.error {
            listener.on_error(error);
            return true;
        }
        return listener.on_unhandled_event(event);
    };

    match event.kind {
        SocketEventKind::ConsumptionRequest => listener.on_consumption_request(consumption),
        SocketEventKind::ConsumptionFinalized => listener.on_consumption_finalized(consumption),
        _ => return listener.on_unhandled_event(event),
    }
    true
}

/// A domain object owning a topic and a listener capability set.
pub trait Listenable {
    type Listener: ?Sized + Send + Sync;

    fn socket_topic(&self) -> &Topic;

    fn wrap_listener(listener: Arc<Self::Listener>) -> Listener;
}

impl Listenable for TransactionConsumption {
    type Listener = dyn TransactionConsumptionListener;

    fn socket_topic(&self) -> &Topic {
        &self.socket_topic
    }

    fn wrap_listener(listener: Arc<Self::Listener>) -> Listener {
        Listener::Consumption(listener)
    }
}

impl Listenable for TransactionRequest {
    type Listener = dyn TransactionRequestListener;

    fn socket_topic(&self) -> &Topic {
        &self.socket_topic
    }

    fn wrap_listener(listener: Arc<Self::Listener>) -> Listener {
        Listener::Request(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<&'static str>>,
    }

    impl TransactionConsumptionListener for Recorder {
        fn on_consumption_approved(&self, _: &TransactionConsumption) {
            self.calls.lock().unwrap().push("approved");
        }

        fn on_error(&self, _: &ApiErrorBody) {
            self.calls.lock().unwrap().push("error");
        }
    }

    #[test]
    fn test_error_event_goes_to_error_slot() {
        let recorder = Arc::new(Recorder::default());
        let listener = Listener::Consumption(recorder.clone());

        let event = SocketEvent::error(
            Topic::new("transaction_consumption:txc_01"),
            ApiErrorBody::new("forbidden_channel", "no access"),
        );
        assert_eq!(listener.deliver(&event), Delivery::Handled);
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["error"]);
    }

    #[test]
    fn test_unmatched_event_without_fallback_is_unhandled() {
        let recorder = Arc::new(Recorder::default());
        let listener = Listener::Consumption(recorder.clone());

        let event = SocketEvent::decode(
            r#"{"topic":"transaction_consumption:txc_01","event":"something_new","data":{}}"#,
        )
        .unwrap();
        assert_eq!(listener.deliver(&event), Delivery::Unhandled);
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[derive(Default)]
    struct RequestRecorder {
        calls: Mutex<Vec<String>>,
    }

    impl TransactionRequestListener for RequestRecorder {
        fn on_consumption_request(&self, consumption: &TransactionConsumption) {
            self.calls.lock().unwrap().push(format!("request:{}", consumption.id));
        }

        fn on_consumption_finalized(&self, consumption: &TransactionConsumption) {
            self.calls.lock().unwrap().push(format!("finalized:{}", consumption.id));
        }

        fn on_error(&self, error: &ApiErrorBody) {
            self.calls.lock().unwrap().push(format!("error:{}", error.code));
        }
    }

    fn request_frame(event: &str, status: &str) -> SocketEvent {
        SocketEvent::decode(&format!(
            r#"{{"topic":"transaction_request:txr_01","event":"{event}","data":{{
                "id": "txc_01",
                "status": "{status}",
                "estimated_request_amount": "100.00",
                "estimated_consumption_amount": "100.00",
                "token": {{"id": "tok_OMG", "symbol": "OMG", "name": "OmiseGO", "subunit_to_unit": 100}},
                "address": "addr_01",
                "transaction_request_id": "txr_01",
                "socket_topic": "transaction_consumption:txc_01",
                "created_at": "2018-05-01T10:00:00Z"
            }}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_request_listener_slots() {
        let recorder = Arc::new(RequestRecorder::default());
        let listener = Listener::Request(recorder.clone());

        let requested = request_frame("transaction_consumption_request", "pending");
        assert_eq!(listener.deliver(&requested), Delivery::Handled);
        let finalized = request_frame("transaction_consumption_finalized", "confirmed");
        assert_eq!(listener.deliver(&finalized), Delivery::Handled);

        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["request:txc_01", "finalized:txc_01"]
        );
    }

    #[test]
    fn test_request_listener_gets_channel_error_with_empty_data() {
        let recorder = Arc::new(RequestRecorder::default());
        let listener = Listener::Request(recorder.clone());

        let event = SocketEvent::decode(
            r#"{"topic":"transaction_request:txr_01","event":"phx_error","data":{}}"#,
        )
        .unwrap();
        assert!(event.error.is_some());
        assert_eq!(listener.deliver(&event), Delivery::Handled);
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["error:channel_error"]);
    }

    #[test]
    fn test_identity_follows_allocation() {
        let recorder = Arc::new(Recorder::default());
        let a = Listener::Consumption(recorder.clone());
        let b = Listener::Consumption(recorder);
        let c = Listener::Consumption(Arc::new(Recorder::default()));
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
    }
}
