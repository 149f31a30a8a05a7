//! Engine-local event bus.
//!
//! Listeners are invoked synchronously, in registration order, for every
//! published [`Emitted`] that matches their filter. A listener only ever sees
//! the payload; to react with a new machine event it must go through a
//! deferred [`Dispatcher`](crate::session::Dispatcher).

use crate::machine::{Emitted, EmittedKind};

/// Handle returned by subscribe calls; pass it to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Boxed listener callback.
pub type Listener = Box<dyn FnMut(&Emitted) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    All,
    Kind(EmittedKind),
}

impl Filter {
    fn matches(self, event: &Emitted) -> bool {
        match self {
            Self::All => true,
            Self::Kind(kind) => event.kind() == kind,
        }
    }
}

struct Subscriber {
    id: SubscriptionId,
    filter: Filter,
    listener: Listener,
}

/// Ordered list of subscribers.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for every event.
    pub fn subscribe_all<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&Emitted) + Send + 'static,
    {
        self.register(Filter::All, Box::new(listener))
    }

    /// Registers a listener for one kind of event.
    pub fn subscribe<F>(&mut self, kind: EmittedKind, listener: F) -> SubscriptionId
    where
        F: FnMut(&Emitted) + Send + 'static,
    {
        self.register(Filter::Kind(kind), Box::new(listener))
    }

    fn register(&mut self, filter: Filter, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            listener,
        });
        id
    }

    /// Removes a listener. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Delivers `event` to every matching listener.
    pub fn publish(&mut self, event: &Emitted) {
        for subscriber in &mut self.subscribers {
            if subscriber.filter.matches(event) {
                (subscriber.listener)(event);
            }
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
