//! Topic to listener registration.
//!
//! The registry is owned by one socket client and shared with its connection
//! task through cheap clones. Locking is per topic: the topic map sits
//! behind a `RwLock` and each topic's listener set behind its own `Mutex`.
//! Callbacks always run with no registry lock held.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ewallet_sdk::objects::Topic;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::debug;

use crate::events::SocketEvent;
use crate::listeners::{Delivery, Listener};

/// Unique identifier of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Returned by [`ListenerRegistry::subscribe`]; pass it back to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    topic: Topic,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }
}

#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    identity: (u8, usize),
    listener: Listener,
    /// Cleared on unsubscribe; checked right before each delivery so a
    /// registration removed mid-dispatch is skipped.
    active: Arc<AtomicBool>,
}

/// Most topics have one or two listeners (a state machine and maybe a UI).
type ListenerSet = SmallVec<[Registration; 2]>;

struct RegistryInner {
    topics: RwLock<HashMap<Topic, Arc<Mutex<ListenerSet>>>>,
    next_id: AtomicU64,
}

/// Thread-safe mapping from topics to the listeners interested in them.
#[derive(Clone)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                topics: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register `listener` on `topic`.
    ///
    /// Registering the same listener object on the same topic again returns
    /// the existing handle and does not add a second registration.
    pub fn subscribe(&self, topic: Topic, listener: impl Into<Listener>) -> SubscriptionHandle {
        self.register(topic, listener).0
    }

    /// Like [`subscribe`](Self::subscribe), also reporting whether a new
    /// registration was created (`false` when an existing one was returned).
    pub fn register(
        &self,
        topic: Topic,
        listener: impl Into<Listener>,
    ) -> (SubscriptionHandle, bool) {
        let listener = listener.into();
        let identity = listener.identity();

        let mut topics = self.inner.topics.write();
        let set = topics.entry(topic.clone()).or_default();
        let mut set = set.lock();

        if let Some(existing) = set.iter().find(|r| r.identity == identity) {
            let handle = SubscriptionHandle {
                id: existing.id,
                topic,
            };
            return (handle, false);
        }

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        set.push(Registration {
            id,
            identity,
            listener,
            active: Arc::new(AtomicBool::new(true)),
        });
        debug!(topic = %topic, subscription = %id, "Listener subscribed");

        (SubscriptionHandle { id, topic }, true)
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut topics = self.inner.topics.write();
        let Some(set) = topics.get(&handle.topic).cloned() else {
            return false;
        };
        let mut set = set.lock();

        let Some(index) = set.iter().position(|r| r.id == handle.id) else {
            return false;
        };
        let removed = set.remove(index);
        removed.active.store(false, Ordering::Release);

        if set.is_empty() {
            drop(set);
            topics.remove(&handle.topic);
        }
        debug!(topic = %handle.topic, subscription = %handle.id, "Listener unsubscribed");
        true
    }

    /// Returns `true` if at least one listener is registered on `topic`.
    pub fn has_listeners(&self, topic: &Topic) -> bool {
        self.inner.topics.read().contains_key(topic)
    }

    pub fn listener_count(&self, topic: &Topic) -> usize {
        let set = self.inner.topics.read().get(topic).cloned();
        set.map(|set| set.lock().len()).unwrap_or(0)
    }

    /// Topics with at least one listener.
    pub fn topics(&self) -> Vec<Topic> {
        self.inner.topics.read().keys().cloned().collect()
    }

    /// Deliver `event` to every listener on its topic.
    ///
    /// Returns the number of listeners that handled it. Events nobody
    /// handles are dropped with a diagnostic.
    pub fn dispatch(&self, event: &SocketEvent) -> usize {
        let set = self.inner.topics.read().get(&event.topic).cloned();
        let Some(set) = set else {
            debug!(topic = %event.topic, event = %event.kind, "No listeners for event");
            return 0;
        };
        let snapshot: ListenerSet = set.lock().clone();

        let mut handled = 0;
        for registration in &snapshot {
            if !registration.active.load(Ordering::Acquire) {
                continue;
            }
            match registration.listener.deliver(event) {
                Delivery::Handled => handled += 1,
                Delivery::Unhandled => {
                    debug!(
                        topic = %event.topic,
                        event = %event.kind,
                        subscription = %registration.id,
                        "Listener has no slot for event, dropped"
                    );
                }
            }
        }
        handled
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("topics", &self.inner.topics.read().len())
            .finish()
    }
}
