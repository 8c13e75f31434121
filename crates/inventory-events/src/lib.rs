//! # inventory-events: Event Bus + Mediator for the Inventory Desktop App
//!
//! Widgets of the inventory desktop app never talk to each other directly.
//! They publish typed events on an [`EventBus`]; a [`Mediator`] listens to
//! the interesting ones, applies the inventory rules from `inventory-core`
//! and publishes derived events back.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Inventory Coordination Layer                        │
//! │                                                                         │
//! │  ┌──────────────┐  publish   ┌──────────────────────────────────────┐  │
//! │  │ Search Widget│───────────►│              EventBus                │  │
//! │  └──────────────┘            │                                      │  │
//! │  ┌──────────────┐  publish   │  Registry: EventType → [Listener]    │  │
//! │  │  Entry Form  │───────────►│  Dispatch: copy list, call each,     │  │
//! │  └──────▲───────┘            │            isolate failures          │  │
//! │         │ ENTRY_ITEM_ADDED   └───────┬───────────────────▲──────────┘  │
//! │         │ VALIDATION_ERROR           │ deliver           │ derived     │
//! │         │ ...                        ▼                   │ events      │
//! │         │                    ┌──────────────────────────────────────┐  │
//! │         └────────────────────│              Mediator                │  │
//! │                              │  selection → validate → rules        │  │
//! │                              │  search    → forward to owner        │  │
//! │                              │  entry     → lines / registration    │  │
//! │                              └──────────────────────────────────────┘  │
//! │                                                                         │
//! │  DELIVERY:                                                             │
//! │  • No host loop bound: listeners run synchronously inside publish()    │
//! │  • Host loop bound: dispatch is queued onto the UI thread's HostLoop   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`bus`] - `EventBus` registry, dispatch and the process-wide instance
//! - [`event`] - `EventType` catalogue and the `EventData` envelope
//! - [`payload`] - Typed payload per event kind
//! - [`listener`] - Listener identity and callbacks
//! - [`host_loop`] - Bounded task queue drained by the UI thread
//! - [`mediator`] - Coordination logic and its collaborators
//! - [`config`] - Bus and mediator settings (TOML + env)
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ```rust
//! use inventory_events::{EventBus, EventPayload, EventType, Mediator, SelectionPayload};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//! let mediator = Mediator::new(bus.clone()).unwrap();
//!
//! let product = json!({"id": 1, "nombre": "Laptop", "categoria_tipo": "MATERIAL"});
//! bus.publish(
//!     EventType::ProductSelected,
//!     EventPayload::Selection(SelectionPayload {
//!         product: product.as_object().cloned().unwrap(),
//!         user_action: None,
//!     }),
//!     "SearchWidget",
//! )
//! .unwrap();
//!
//! assert!(mediator.current_selected().is_some());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod host_loop;
pub mod listener;
pub mod mediator;
pub mod payload;

// =============================================================================
// Re-exports
// =============================================================================

// Bus
pub use bus::{BusDebugInfo, BusStats, EventBus};
pub use event::{now_timestamp, EventData, EventType, EVENT_SCHEMA_VERSION};
pub use host_loop::{HostLoop, HostLoopHandle, HostTask, DEFAULT_QUEUE_CAPACITY};
pub use listener::{Listener, ListenerError, ListenerId, ListenerResult};
pub use payload::{
    BusinessRulePayload, EntryActionKind, EntryActionPayload, EntryItemPayload, EventPayload,
    FormSnapshotPayload, FormSubmissionPayload, PayloadKind, RegistrationPayload,
    SearchRequestPayload, SearchResultPayload, SearchType, SelectionPayload,
    UiStateChangePayload, ValidationPayload,
};

// Mediator
pub use mediator::{
    EntityLookup, EntryCommands, InMemoryCatalog, Mediator, MediatorBuilder, MediatorState,
};

// Configuration and errors
pub use config::{BusSettings, CoordinationConfig, MediatorSettings};
pub use error::{BusError, BusResult, CollaboratorError, MediatorError, MediatorResult};
