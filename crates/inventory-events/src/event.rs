//! # Event Types and Envelope
//!
//! The closed set of event types widgets exchange, and the envelope the bus
//! hands to every listener.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Event Catalogue                                 │
//! │                                                                         │
//! │  Search Widget                  Mediator                 Entry Form    │
//! │  ─────────────                  ────────                 ──────────    │
//! │                                                                         │
//! │  PRODUCT_SELECTED ─────────────► validate ──► ENTRY_ACTION ──────────► │
//! │                                     │         (product_selected)       │
//! │                                     ├──────► VALIDATION_ERROR ───────► │
//! │                                     └──────► BUSINESS_RULE_VIOLATION ► │
//! │                                                                         │
//! │  ◄──────────── PRODUCT_SEARCH_REQUEST ◄──── forward ◄── any widget     │
//! │  PRODUCT_SEARCH_RESULT ──────────────────────────────────────────────► │
//! │                                                                         │
//! │                     ◄── ENTRY_ACTION (add/remove/validate/register)    │
//! │                     ──► ENTRY_ITEM_ADDED / ENTRY_ITEM_REMOVED          │
//! │                     ──► ENTRY_VALIDATION_REQUESTED / ENTRY_FORM_CLEARED│
//! │                     ──► ENTRY_REGISTERED                                │
//! │                     ◄── VALIDATION_RESULT                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{BusError, BusResult};
use crate::payload::{EventPayload, PayloadKind};

/// Version of the event catalogue and payload schema.
///
/// Bump when a payload field changes meaning or an event type is removed.
pub const EVENT_SCHEMA_VERSION: u32 = 1;

// =============================================================================
// Event Type
// =============================================================================

/// Every event type the bus accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Product search & selection
    ProductSelected,
    ProductSearchRequest,
    ProductSearchResult,

    // Inventory entry form
    EntryAction,
    EntryItemAdded,
    EntryItemRemoved,
    EntryValidationRequested,
    EntryFormCleared,
    EntryRegistered,

    // Validation
    ValidationResult,
    ValidationSuccess,
    ValidationError,
    BusinessRuleViolation,

    // Generic UI
    UiStateChange,
    FormSubmission,
}

impl EventType {
    /// The versioned catalogue, in declaration order.
    pub const ALL: [EventType; 15] = [
        EventType::ProductSelected,
        EventType::ProductSearchRequest,
        EventType::ProductSearchResult,
        EventType::EntryAction,
        EventType::EntryItemAdded,
        EventType::EntryItemRemoved,
        EventType::EntryValidationRequested,
        EventType::EntryFormCleared,
        EventType::EntryRegistered,
        EventType::ValidationResult,
        EventType::ValidationSuccess,
        EventType::ValidationError,
        EventType::BusinessRuleViolation,
        EventType::UiStateChange,
        EventType::FormSubmission,
    ];

    /// Returns the wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::ProductSelected => "PRODUCT_SELECTED",
            EventType::ProductSearchRequest => "PRODUCT_SEARCH_REQUEST",
            EventType::ProductSearchResult => "PRODUCT_SEARCH_RESULT",
            EventType::EntryAction => "ENTRY_ACTION",
            EventType::EntryItemAdded => "ENTRY_ITEM_ADDED",
            EventType::EntryItemRemoved => "ENTRY_ITEM_REMOVED",
            EventType::EntryValidationRequested => "ENTRY_VALIDATION_REQUESTED",
            EventType::EntryFormCleared => "ENTRY_FORM_CLEARED",
            EventType::EntryRegistered => "ENTRY_REGISTERED",
            EventType::ValidationResult => "VALIDATION_RESULT",
            EventType::ValidationSuccess => "VALIDATION_SUCCESS",
            EventType::ValidationError => "VALIDATION_ERROR",
            EventType::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            EventType::UiStateChange => "UI_STATE_CHANGE",
            EventType::FormSubmission => "FORM_SUBMISSION",
        }
    }

    /// The payload shape events of this type must carry.
    pub const fn payload_kind(&self) -> PayloadKind {
        match self {
            EventType::ProductSelected => PayloadKind::Selection,
            EventType::ProductSearchRequest => PayloadKind::SearchRequest,
            EventType::ProductSearchResult => PayloadKind::SearchResult,
            EventType::EntryAction => PayloadKind::EntryAction,
            EventType::EntryItemAdded | EventType::EntryItemRemoved => PayloadKind::EntryItem,
            EventType::EntryValidationRequested | EventType::EntryFormCleared => {
                PayloadKind::FormSnapshot
            }
            EventType::EntryRegistered => PayloadKind::Registration,
            EventType::ValidationResult
            | EventType::ValidationSuccess
            | EventType::ValidationError => PayloadKind::Validation,
            EventType::BusinessRuleViolation => PayloadKind::BusinessRule,
            EventType::UiStateChange => PayloadKind::UiStateChange,
            EventType::FormSubmission => PayloadKind::FormSubmission,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(BusError::contract("event_type is required"));
        }
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| BusError::contract(format!("Unknown event type: '{}'", name)))
    }
}

// =============================================================================
// Event Envelope
// =============================================================================

/// What every listener receives for one publish.
///
/// ## Invariants
/// - `timestamp` is finite and positive (seconds since the Unix epoch)
/// - `source` is non-blank
/// - `payload.kind() == event_type.payload_kind()` and the payload
///   contract holds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventData {
    pub event_type: EventType,
    pub timestamp: f64,
    pub payload: EventPayload,
    pub source: String,
}

impl EventData {
    /// Builds an envelope stamped with the current time.
    pub fn new(
        event_type: EventType,
        payload: EventPayload,
        source: impl Into<String>,
    ) -> BusResult<Self> {
        Self::with_timestamp(event_type, payload, source, now_timestamp())
    }

    /// Builds an envelope with an explicit timestamp.
    ///
    /// A non-positive or non-finite timestamp is replaced by the current time.
    pub fn with_timestamp(
        event_type: EventType,
        payload: EventPayload,
        source: impl Into<String>,
        timestamp: f64,
    ) -> BusResult<Self> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(BusError::contract("source is required"));
        }

        let expected = event_type.payload_kind();
        if payload.kind() != expected {
            return Err(BusError::contract(format!(
                "{} expects a {:?} payload, got {:?}",
                event_type,
                expected,
                payload.kind()
            )));
        }
        payload.check_contract()?;

        let timestamp = if timestamp.is_finite() && timestamp > 0.0 {
            timestamp
        } else {
            now_timestamp()
        };

        Ok(EventData {
            event_type,
            timestamp,
            payload,
            source,
        })
    }

    /// The timestamp as a UTC date-time.
    pub fn occurred_at(&self) -> DateTime<Utc> {
        let secs = self.timestamp.trunc() as i64;
        let nanos = (self.timestamp.fract() * 1e9) as u32;
        Utc.timestamp_opt(secs, nanos)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Current time as fractional seconds since the Unix epoch.
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
