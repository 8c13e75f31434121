//! # Event Bus
//!
//! In-process publish/subscribe exchange shared by every widget.
//!
//! ## Publish Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Publish → Dispatch                             │
//! │                                                                         │
//! │  publish(event_type, payload, source)                                  │
//! │       │                                                                 │
//! │       ├── EventData::new()  ──► ContractViolation (returned)           │
//! │       │                                                                 │
//! │       ├── host loop bound?  ──► yes: try_send dispatch task, return    │
//! │       │                          (HostLoopSaturated / HostLoopClosed)   │
//! │       │                     ──► no:  dispatch now, in this thread      │
//! │       ▼                                                                 │
//! │  dispatch(event)                                                        │
//! │       1. lock registry, clone the listener list, unlock                │
//! │       2. call each listener in registration order                      │
//! │       3. Err or panic ──► subscriber fault: logged, delivery goes on   │
//! │                                                                         │
//! │  Listeners may register, unregister and publish from inside a          │
//! │  callback: the registry lock is never held while user code runs.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Process-wide Instance
//! [`EventBus::global`] creates the bus on first access and hands out clones
//! afterwards. Components should still receive their bus from the
//! composition root; [`EventBus::new`] builds an isolated bus for tests.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::BusResult;
use crate::event::{EventData, EventType};
use crate::host_loop::HostLoopHandle;
use crate::listener::{Listener, ListenerResult};
use crate::payload::EventPayload;

type Registry = BTreeMap<EventType, Vec<Listener>>;

static GLOBAL_BUS: Mutex<Option<EventBus>> = Mutex::new(None);

// =============================================================================
// Introspection Types
// =============================================================================

/// Delivery counters since the bus was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Events accepted for delivery.
    pub published: u64,
    /// Listener invocations that returned `Ok`.
    pub delivered: u64,
    /// Listener invocations that returned `Err` or panicked.
    pub faults: u64,
}

/// Snapshot of the registry for debug panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusDebugInfo {
    pub total_events: usize,
    pub listeners_per_event: BTreeMap<EventType, usize>,
    pub total_subscriptions: usize,
    pub host_loop_bound: bool,
}

// =============================================================================
// Event Bus
// =============================================================================

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    delivered: AtomicU64,
    faults: AtomicU64,
}

#[derive(Default)]
struct BusInner {
    registry: Mutex<Registry>,
    host: Mutex<Option<HostLoopHandle>>,
    counters: Counters,
}

/// Cheap cloneable handle to one bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates an isolated bus with no host loop bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide bus, creating it on first access.
    pub fn global() -> EventBus {
        let mut slot = GLOBAL_BUS.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| {
            info!("Creating process-wide event bus");
            EventBus::new()
        })
        .clone()
    }

    /// Drops the process-wide bus so the next [`global`](Self::global) call
    /// starts fresh. Listeners and host loop of the old bus are released.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset_global() {
        let old = GLOBAL_BUS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(bus) = old {
            bus.clear_all_listeners();
            bus.unbind_host_loop();
        }
    }

    /// Returns true if both handles point at the same bus.
    pub fn same_bus(&self, other: &EventBus) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers `listener` for `event_type`.
    ///
    /// Registering the same listener twice for one event type is a no-op.
    pub fn register(&self, event_type: EventType, listener: Listener) {
        let mut registry = self.registry();
        let listeners = registry.entry(event_type).or_default();
        if listeners.contains(&listener) {
            warn!(
                event_type = %event_type,
                listener = listener.label(),
                "Listener already registered, ignoring"
            );
            return;
        }
        debug!(
            event_type = %event_type,
            listener = listener.label(),
            "Listener registered"
        );
        listeners.push(listener);
    }

    /// Registers `listener` under a wire event name.
    pub fn register_named(&self, event_type: &str, listener: Listener) -> BusResult<()> {
        let event_type = event_type.parse()?;
        self.register(event_type, listener);
        Ok(())
    }

    /// Wraps `callback` in a new [`Listener`], registers it and returns it.
    pub fn subscribe<F>(&self, event_type: EventType, label: impl Into<String>, callback: F) -> Listener
    where
        F: Fn(&EventData) -> ListenerResult + Send + Sync + 'static,
    {
        let listener = Listener::new(label, callback);
        self.register(event_type, listener.clone());
        listener
    }

    /// Removes `listener` from `event_type`. Returns false if it was not there.
    pub fn unregister(&self, event_type: EventType, listener: &Listener) -> bool {
        let mut registry = self.registry();
        let Some(listeners) = registry.get_mut(&event_type) else {
            return false;
        };
        let Some(position) = listeners.iter().position(|l| l == listener) else {
            return false;
        };
        listeners.remove(position);
        if listeners.is_empty() {
            registry.remove(&event_type);
        }
        debug!(
            event_type = %event_type,
            listener = listener.label(),
            "Listener unregistered"
        );
        true
    }

    /// Removes every listener for every event type.
    pub fn clear_all_listeners(&self) {
        self.registry().clear();
        info!("All event listeners cleared");
    }

    /// Removes every listener for `event_type`; returns how many were removed.
    pub fn clear_listeners_for_event(&self, event_type: EventType) -> usize {
        let removed = self
            .registry()
            .remove(&event_type)
            .map_or(0, |listeners| listeners.len());
        if removed > 0 {
            debug!(event_type = %event_type, removed, "Listeners cleared for event");
        }
        removed
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    /// Publishes one event.
    ///
    /// Contract violations and scheduling failures are returned; listener
    /// failures never are.
    pub fn publish(
        &self,
        event_type: EventType,
        payload: EventPayload,
        source: impl Into<String>,
    ) -> BusResult<()> {
        let event = EventData::new(event_type, payload, source)?;
        self.publish_event(event)
    }

    /// Publishes an event whose type and payload arrive as JSON.
    pub fn publish_json(
        &self,
        event_type: &str,
        payload: Value,
        source: impl Into<String>,
    ) -> BusResult<()> {
        let event_type: EventType = event_type.parse()?;
        let payload = EventPayload::decode(event_type, payload)?;
        self.publish(event_type, payload, source)
    }

    /// Publishes an already-built envelope.
    pub fn publish_event(&self, event: EventData) -> BusResult<()> {
        let host = self
            .inner
            .host
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match host {
            Some(handle) => {
                let event_type = event.event_type;
                let inner = Arc::clone(&self.inner);
                handle.schedule(Box::new(move || inner.dispatch(&event)))?;
                self.inner.counters.published.fetch_add(1, Ordering::Relaxed);
                debug!(event_type = %event_type, "Event scheduled on host loop");
            }
            None => {
                self.inner.counters.published.fetch_add(1, Ordering::Relaxed);
                self.inner.dispatch(&event);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Host Loop Binding
    // =========================================================================

    /// Routes all future deliveries through `handle`.
    pub fn bind_host_loop(&self, handle: HostLoopHandle) {
        info!(capacity = handle.capacity(), "Host loop bound to event bus");
        *self.inner.host.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Reverts to synchronous delivery; returns the previous handle.
    pub fn unbind_host_loop(&self) -> Option<HostLoopHandle> {
        let previous = self
            .inner
            .host
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!("Host loop unbound, delivery is synchronous");
        }
        previous
    }

    pub fn is_host_loop_bound(&self) -> bool {
        self.inner
            .host
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Event types that currently have at least one listener.
    pub fn registered_events(&self) -> Vec<EventType> {
        self.registry().keys().copied().collect()
    }

    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.registry().get(&event_type).map_or(0, Vec::len)
    }

    pub fn has_listener(&self, event_type: EventType, listener: &Listener) -> bool {
        self.registry()
            .get(&event_type)
            .is_some_and(|listeners| listeners.contains(listener))
    }

    pub fn debug_info(&self) -> BusDebugInfo {
        let listeners_per_event: BTreeMap<EventType, usize> = self
            .registry()
            .iter()
            .map(|(event_type, listeners)| (*event_type, listeners.len()))
            .collect();

        BusDebugInfo {
            total_events: listeners_per_event.len(),
            total_subscriptions: listeners_per_event.values().sum(),
            listeners_per_event,
            host_loop_bound: self.is_host_loop_bound(),
        }
    }

    pub fn stats(&self) -> BusStats {
        let counters = &self.inner.counters;
        BusStats {
            published: counters.published.load(Ordering::Relaxed),
            delivered: counters.delivered.load(Ordering::Relaxed),
            faults: counters.faults.load(Ordering::Relaxed),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.registry()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("debug_info", &self.debug_info())
            .finish()
    }
}

// =============================================================================
// Dispatch
// =============================================================================

impl BusInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, event: &EventData) {
        let listeners = self
            .registry()
            .get(&event.event_type)
            .cloned()
            .unwrap_or_default();

        if listeners.is_empty() {
            debug!(event_type = %event.event_type, "No listeners for event");
            return;
        }

        for listener in &listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.call(event)));
            let failure = match outcome {
                Ok(Ok(())) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Ok(Err(err)) => err.to_string(),
                Err(panic) => panic_message(panic.as_ref()),
            };

            self.counters.faults.fetch_add(1, Ordering::Relaxed);
            error!(
                event_type = %event.event_type,
                source = %event.source,
                listener = listener.label(),
                error = %failure,
                "Subscriber fault"
            );
        }

        debug!(
            event_type = %event.event_type,
            listeners = listeners.len(),
            "Event delivered"
        );
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
