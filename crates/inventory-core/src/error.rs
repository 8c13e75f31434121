//! # Error Types
//!
//! Domain-specific error types for inventory-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  inventory-core errors (this file)                                     │
//! │  ├── CoreError        - Entry / lookup failures                        │
//! │  └── ValidationError  - One failing field of a snapshot                │
//! │                                                                         │
//! │  inventory-events errors (separate crate)                              │
//! │  ├── BusError         - Contract violations at publish/register        │
//! │  └── MediatorError    - Logged inside handlers, never escapes          │
//! │                                                                         │
//! │  Flow: ValidationError → VALIDATION_ERROR event → subscribing widget   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation failures are never raised across the bus. The mediator turns
//! them into events, so the `Display` text of each variant is what a widget
//! ends up showing.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Failures of an inventory entry operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The lookup collaborator no longer knows the selected product.
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// An add was requested without a current selection.
    #[error("No product is currently selected")]
    NoSelection,

    /// A registration was requested with no entry lines.
    #[error("Add products before registering the entry")]
    EmptyEntry,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the form field this error should be attached to.
    pub fn field(&self) -> &str {
        match self {
            CoreError::ProductNotFound(_) | CoreError::NoSelection => "product",
            CoreError::EmptyEntry => "entry_lines",
            CoreError::Validation(err) => err.field(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single structural problem with a snapshot field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing, null, or blank.
    #[error("Required field '{field}' is missing or empty")]
    Required { field: String },

    /// Field has the wrong primitive type or cannot be parsed.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value exceeds what the entry can hold.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Service products carry no physical stock.
    #[error("'{name}' is a SERVICIO product; only MATERIAL products can enter inventory")]
    NotStockable { name: String },
}

impl ValidationError {
    /// Returns the name of the failing field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::TooLarge { field } => field,
            ValidationError::NotStockable { .. } => "categoria_tipo",
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
