//! Lightweight store telemetry so reload and mutation behaviour can be inspected in tests and logs.

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LoadRequested(String),
    LoadCompleted { collection: String, count: usize },
    LoadFailed { collection: String, error: String },
    StaleDiscarded(String),
    MutationApplied { collection: String, action: &'static str },
    MutationFailed {
        collection: String,
        action: &'static str,
        error: String,
    },
}

pub struct Handle {
    #[cfg(feature = "telemetry")]
    events: Mutex<Vec<Event>>,
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").finish_non_exhaustive()
    }
}

impl Handle {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "telemetry")]
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, event: Event) {
        #[cfg(feature = "telemetry")]
        {
            match &event {
                Event::LoadRequested(collection) => {
                    tracing::debug!(collection = collection.as_str(), "store load requested")
                }
                Event::LoadCompleted { collection, count } => {
                    tracing::debug!(
                        collection = collection.as_str(),
                        count,
                        "store load completed"
                    );
                }
                Event::LoadFailed { collection, error } => {
                    tracing::debug!(collection = collection.as_str(), error = %error, "store load failed");
                }
                Event::StaleDiscarded(collection) => tracing::debug!(
                    collection = collection.as_str(),
                    "store discarded stale response"
                ),
                Event::MutationApplied { collection, action } => tracing::debug!(
                    collection = collection.as_str(),
                    action = *action,
                    "store mutation applied"
                ),
                Event::MutationFailed {
                    collection,
                    action,
                    error,
                } => tracing::debug!(
                    collection = collection.as_str(),
                    action = *action,
                    error = %error,
                    "store mutation failed"
                ),
            }
            self.events.lock().push(event);
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = event;
        }
    }

    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "telemetry")
    }

    /// Recorded events, oldest first; empty when the `telemetry` feature is off.
    pub fn events(&self) -> Vec<Event> {
        #[cfg(feature = "telemetry")]
        {
            self.events.lock().clone()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            Vec::new()
        }
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }
}
