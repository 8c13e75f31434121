//! # inventory-core: Pure Domain Rules for Inventory Coordination
//!
//! This crate holds the rules the coordination layer enforces when widgets
//! exchange product selections and entry-form actions. Everything here is a
//! pure function over plain key→value snapshots.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Inventory Coordination Layers                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      UI Widgets (external)                      │   │
//! │  │    Search Widget ──► (bus) ──► Entry Form ──► (bus) ──► ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ publish / subscribe                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              inventory-events (EventBus + Mediator)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ inventory-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌─────────────┐  ┌───────────────────────┐    │   │
//! │  │   │   types   │  │ validation  │  │        rules          │    │   │
//! │  │   │ Snapshot  │  │ structural  │  │ BusinessRules trait   │    │   │
//! │  │   │ EntryLine │  │ entry lines │  │ ProductRules          │    │   │
//! │  │   └───────────┘  └─────────────┘  └───────────────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO EVENT BUS • PURE FUNCTIONS                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Snapshot aliases, category/movement enums, entry lines
//! - [`validation`] - Structural validation of product snapshots
//! - [`rules`] - Non-blocking business-rule evaluation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use inventory_core::validation::validate_product_snapshot;
//! use serde_json::json;
//!
//! let snapshot = json!({"id": 1, "nombre": "Laptop", "categoria_tipo": "MATERIAL"});
//! let view = validate_product_snapshot(snapshot.as_object().unwrap()).unwrap();
//! assert_eq!(view.id, 1);
//! assert_eq!(view.name, "Laptop");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod rules;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use rules::{BusinessRules, ProductRules};
pub use types::*;
