//! # Widget Bridge
//!
//! Entry points the UI shell calls with JSON. Widgets publish through here
//! and read back the mediator's state for rendering.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  widget (any thread)                                                    │
//! │    publish_from_widget("ENTRY_ACTION", {"action": "add", ...}, "Form") │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  EventBus::publish_json ──► contract check ──► host loop queue          │
//! │         │                                                               │
//! │         └── Err ──► ApiError {code, message}                            │
//! │                                                                         │
//! │  mediator_state()  ──► MediatorState as JSON (selection, lines, form)  │
//! │  bus_debug_info()  ──► listeners per event, host loop binding          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;
use tracing::debug;

use inventory_events::{BusDebugInfo, BusStats, EventBus, Mediator, MediatorState};

use crate::error::ApiError;

/// Publishes an event a widget described in JSON.
pub fn publish_from_widget(
    bus: &EventBus,
    event_type: &str,
    payload: Value,
    source: &str,
) -> Result<(), ApiError> {
    debug!(event_type, source, "publish_from_widget");
    bus.publish_json(event_type, payload, source)?;
    Ok(())
}

/// Current coordination state.
pub fn mediator_state(mediator: &Mediator) -> MediatorState {
    mediator.state()
}

pub fn bus_debug_info(bus: &EventBus) -> BusDebugInfo {
    bus.debug_info()
}

pub fn bus_stats(bus: &EventBus) -> BusStats {
    bus.stats()
}
