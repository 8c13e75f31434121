//! # Event Error Types
//!
//! Error types for the bus, the mediator, and its collaborators.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Event Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Contract     │  │   Scheduling    │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Contract       │  │  HostLoop       │  │  InvalidConfig          │ │
//! │  │  Violation      │  │  Saturated      │  │  ConfigLoadFailed       │ │
//! │  │                 │  │  HostLoopClosed │  │  ConfigSaveFailed       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │         ▲                                                               │
//! │         │ returned to the publisher / registrant                       │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────────────────────────────────┐  │
//! │  │ MediatorError   │  │ Subscriber faults                           │  │
//! │  │ logged inside   │  │ never returned; logged by dispatch with     │  │
//! │  │ the handlers    │  │ event_type, source, listener and error      │  │
//! │  └─────────────────┘  └─────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors returned synchronously by bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    // =========================================================================
    // Contract Errors
    // =========================================================================
    /// The caller broke the publish/register contract.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    // =========================================================================
    // Scheduling Errors
    // =========================================================================
    /// The host loop queue is full; this publish was not scheduled.
    #[error("Host loop queue is full ({capacity} pending tasks)")]
    HostLoopSaturated { capacity: usize },

    /// The host loop consumer is gone.
    #[error("Host loop is closed")]
    HostLoopClosed,

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid coordination configuration.
    #[error("Invalid coordination configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<std::io::Error> for BusError {
    fn from(err: std::io::Error) -> Self {
        BusError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for BusError {
    fn from(err: toml::de::Error) -> Self {
        BusError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for BusError {
    fn from(err: toml::ser::Error) -> Self {
        BusError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl BusError {
    /// Shorthand for a contract violation.
    pub fn contract(message: impl Into<String>) -> Self {
        BusError::ContractViolation(message.into())
    }

    /// Returns true if the caller passed something the bus refuses.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, BusError::ContractViolation(_))
    }

    /// Returns true if the event was valid but could not be scheduled.
    pub fn is_scheduling_error(&self) -> bool {
        matches!(
            self,
            BusError::HostLoopSaturated { .. } | BusError::HostLoopClosed
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BusError::InvalidConfig(_)
                | BusError::ConfigLoadFailed(_)
                | BusError::ConfigSaveFailed(_)
        )
    }
}

// =============================================================================
// Collaborator Error
// =============================================================================

/// Failure reported by a lookup or persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    /// The backing service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request.
    #[error("Rejected: {0}")]
    Rejected(String),
}

// =============================================================================
// Mediator Error
// =============================================================================

/// Failure inside a mediator handler. Logged, never returned to the bus.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// The event carried a payload of the wrong kind.
    #[error("Unexpected payload for {event_type}: {actual}")]
    UnexpectedPayload {
        event_type: &'static str,
        actual: &'static str,
    },

    /// A validation failure arrived without `validation_type`.
    #[error("Validation failure without validation_type from {source_name}")]
    MissingDiscriminator { source_name: String },

    /// A follow-up publish failed.
    #[error("Publish failed: {0}")]
    Publish(#[from] BusError),

    /// A collaborator call failed.
    #[error("Collaborator failed: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Result type alias for mediator handlers.
pub type MediatorResult<T> = Result<T, MediatorError>;
