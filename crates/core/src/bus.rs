//! Cross-domain publish/subscribe channel used to announce that a domain's data may be stale.
//!
//! Dispatch is synchronous: [`EventBus::publish`] runs every handler registered for the
//! topic before returning. Handlers are snapshotted before dispatch, so a handler that
//! publishes again (or a subscription change made meanwhile) never deadlocks the registry.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    TasksChanged,
    FinanceChanged,
    JournalChanged,
    ProjectsChanged,
    /// UI-originated request to open a task for editing; carries the task.
    EditTask,
}

impl Topic {
    pub const DOMAINS: &'static [Topic] = &[
        Topic::TasksChanged,
        Topic::FinanceChanged,
        Topic::JournalChanged,
        Topic::ProjectsChanged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::TasksChanged => "tasks-changed",
            Topic::FinanceChanged => "finance-changed",
            Topic::JournalChanged => "journal-changed",
            Topic::ProjectsChanged => "projects-changed",
            Topic::EditTask => "edit-task",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub topic: Topic,
    pub payload: Option<Value>,
}

impl Signal {
    pub fn bare(topic: Topic) -> Self {
        Self {
            topic,
            payload: None,
        }
    }

    pub fn with_payload<T: Serialize>(topic: Topic, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            topic,
            payload: Some(serde_json::to_value(payload)?),
        })
    }

    pub fn payload_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.payload
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Signal) + Send + Sync>;

struct Entry {
    id: SubscriptionId,
    topic: Topic,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Injectable event bus, built once at startup and cloned into every participant.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("EventBus")
            .field("subscribers", &registry.entries.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        registry.entries.push(Entry {
            id,
            topic,
            handler: Arc::new(handler),
        });
        tracing::trace!(topic = topic.as_str(), "bus subscription added");
        id
    }

    /// Like [`EventBus::subscribe`], but the registration ends when the guard drops.
    pub fn scoped<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        let id = self.subscribe(topic, handler);
        Subscription {
            bus: self.clone(),
            id,
        }
    }

    /// Returns whether a registration was removed; repeated calls are no-ops.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.entries.len();
        registry.entries.retain(|entry| entry.id != id);
        before != registry.entries.len()
    }

    pub fn publish(&self, topic: Topic) {
        self.emit(Signal::bare(topic));
    }

    pub fn emit(&self, signal: Signal) {
        let handlers: Vec<Handler> = {
            let registry = self.registry.lock();
            registry
                .entries
                .iter()
                .filter(|entry| entry.topic == signal.topic)
                .map(|entry| entry.handler.clone())
                .collect()
        };
        tracing::debug!(
            topic = signal.topic.as_str(),
            handlers = handlers.len(),
            "bus publish"
        );
        for handler in handlers {
            handler(&signal);
        }
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.topic == topic)
            .count()
    }
}

/// Registration guard returned by [`EventBus::scoped`].
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct Subscription {
    bus: EventBus,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Subscription").field(&self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
