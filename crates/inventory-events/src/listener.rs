//! # Listener Handles
//!
//! A listener is a shared callback with a stable identity. The bus compares
//! listeners by id, never by closure, so registering a clone of the same
//! handle twice is a no-op and unregistering needs the handle you kept.
//!
//! ```rust
//! use inventory_events::{EventBus, EventType, Listener};
//!
//! let bus = EventBus::new();
//! let listener = Listener::new("status-bar", |event| {
//!     println!("{} from {}", event.event_type, event.source);
//!     Ok(())
//! });
//!
//! bus.register(EventType::ProductSelected, listener.clone());
//! bus.register(EventType::ProductSelected, listener.clone());
//! assert_eq!(bus.listener_count(EventType::ProductSelected), 1);
//!
//! assert!(bus.unregister(EventType::ProductSelected, &listener));
//! ```

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::event::EventData;

/// Error a listener may return; logged by dispatch as a subscriber fault.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// What a listener callback returns.
pub type ListenerResult = Result<(), ListenerError>;

type Callback = dyn Fn(&EventData) -> ListenerResult + Send + Sync;

/// Identity of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        ListenerId(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cloneable listener handle. Clones share the id and the callback.
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    label: Arc<str>,
    callback: Arc<Callback>,
}

impl Listener {
    /// Wraps `callback` under a fresh id.
    ///
    /// `label` only shows up in logs and debug output.
    pub fn new<F>(label: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&EventData) -> ListenerResult + Send + Sync + 'static,
    {
        Listener {
            id: ListenerId::new(),
            label: Arc::from(label.into()),
            callback: Arc::new(callback),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the callback.
    pub fn call(&self, event: &EventData) -> ListenerResult {
        (self.callback)(event)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::payload::{EventPayload, SelectionPayload};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_identity_is_shared_by_clones() {
        let a = Listener::new("a", |_| Ok(()));
        let b = Listener::new("a", |_| Ok(()));

        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.label(), "a");
    }

    #[test]
    fn test_call_runs_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let listener = Listener::new("counter", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let event = EventData::new(
            EventType::ProductSelected,
            EventPayload::Selection(SelectionPayload::default()),
            "test",
        )
        .unwrap();
        listener.call(&event).unwrap();
        listener.clone().call(&event).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
