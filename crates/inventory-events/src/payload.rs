//! # Event Payloads
//!
//! One payload shape per event type, checked when an event is built.
//!
//! ## Payload Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Payload Kind per Event Type                        │
//! │                                                                         │
//! │  Selection      PRODUCT_SELECTED                                       │
//! │  SearchRequest  PRODUCT_SEARCH_REQUEST                                 │
//! │  SearchResult   PRODUCT_SEARCH_RESULT      results ≤ total, ms ≥ 0     │
//! │  EntryAction    ENTRY_ACTION                                           │
//! │  EntryItem      ENTRY_ITEM_ADDED, ENTRY_ITEM_REMOVED                   │
//! │  FormSnapshot   ENTRY_VALIDATION_REQUESTED, ENTRY_FORM_CLEARED         │
//! │  Registration   ENTRY_REGISTERED           entry_id non-empty          │
//! │  Validation     VALIDATION_RESULT/SUCCESS/ERROR                        │
//! │                                            !is_valid ⇒ errors present  │
//! │  BusinessRule   BUSINESS_RULE_VIOLATION    warnings non-empty          │
//! │  UiStateChange  UI_STATE_CHANGE            widget_name non-blank       │
//! │  FormSubmission FORM_SUBMISSION            !status ⇒ errors present    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payloads serialize as plain JSON objects (no variant tag). Decoding goes
//! through [`EventPayload::decode`], which picks the shape from the event type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use inventory_core::{EntitySnapshot, EntryLine, MovementType};

use crate::error::{BusError, BusResult};
use crate::event::EventType;

// =============================================================================
// Payload Kind
// =============================================================================

/// Discriminant of [`EventPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Selection,
    SearchRequest,
    SearchResult,
    EntryAction,
    EntryItem,
    FormSnapshot,
    Registration,
    Validation,
    BusinessRule,
    UiStateChange,
    FormSubmission,
}

// =============================================================================
// Enumerations
// =============================================================================

/// How a search term should be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Code,
    Name,
    Barcode,
    #[default]
    Partial,
    Exact,
}

/// What the entry form asks the mediator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EntryActionKind {
    Add,
    Remove,
    Update,
    Clear,
    Validate,
    Register,
    /// Published by the mediator after it accepted a selection.
    ProductSelected,
}

impl EntryActionKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryActionKind::Add => "add",
            EntryActionKind::Remove => "remove",
            EntryActionKind::Update => "update",
            EntryActionKind::Clear => "clear",
            EntryActionKind::Validate => "validate",
            EntryActionKind::Register => "register",
            EntryActionKind::ProductSelected => "product_selected",
        }
    }
}

impl std::fmt::Display for EntryActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payload Structs
// =============================================================================

/// A widget picked a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionPayload {
    #[serde(default)]
    pub product: EntitySnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_action: Option<String>,
}

/// A widget wants the search owner to run a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRequestPayload {
    #[serde(default)]
    pub search_term: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub filters: EntitySnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<String>,
}

/// The search owner finished a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPayload {
    pub search_term: String,
    #[serde(default)]
    pub results: Vec<EntitySnapshot>,
    #[serde(default)]
    pub total_results: usize,
    #[serde(default)]
    pub search_duration_ms: f64,
    #[serde(default)]
    pub search_source: String,
}

/// An entry-form action, or the mediator's "selection applied" notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryActionPayload {
    pub action: EntryActionKind,
    #[serde(default)]
    pub movement_type: MovementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<EntitySnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub form_state: EntitySnapshot,
}

impl EntryActionPayload {
    /// An action with no product, quantity or form state.
    pub fn new(action: EntryActionKind) -> Self {
        EntryActionPayload {
            action,
            movement_type: MovementType::default(),
            product: None,
            quantity: None,
            form_state: EntitySnapshot::new(),
        }
    }
}

/// A line was added to or removed from the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryItemPayload {
    pub product_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<EntitySnapshot>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub movement_type: MovementType,
    #[serde(default)]
    pub total_lines: usize,
}

/// The entry form as the mediator sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshotPayload {
    #[serde(default)]
    pub form_state: EntitySnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<EntitySnapshot>,
    #[serde(default)]
    pub lines: Vec<EntryLine>,
}

/// An entry was persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationPayload {
    pub entry_id: String,
    #[serde(default)]
    pub ticket_number: String,
    #[serde(default)]
    pub line_count: usize,
}

/// Outcome of a validation.
///
/// `validation_type` may be absent; consumers must tolerate that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationPayload {
    #[serde(default)]
    pub validation_type: Option<String>,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validator_source: Option<String>,
}

impl ValidationPayload {
    /// A failed validation of the given type.
    pub fn failure(validation_type: impl Into<String>, error_messages: Vec<String>) -> Self {
        ValidationPayload {
            validation_type: Some(validation_type.into()),
            is_valid: false,
            error_messages,
            ..Default::default()
        }
    }
}

/// Business-rule warnings about an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRulePayload {
    pub rule_type: String,
    #[serde(default)]
    pub is_blocking: bool,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<EntitySnapshot>,
}

/// A widget changed visible state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiStateChangePayload {
    pub widget_name: String,
    #[serde(default)]
    pub state_change: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A form was submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSubmissionPayload {
    pub form_name: String,
    #[serde(default)]
    pub form_data: EntitySnapshot,
    #[serde(default)]
    pub validation_status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_result: Option<Value>,
    #[serde(default)]
    pub errors: Vec<String>,
}

// =============================================================================
// Event Payload
// =============================================================================

/// Payload of one event; the variant must match the event type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Selection(SelectionPayload),
    SearchRequest(SearchRequestPayload),
    SearchResult(SearchResultPayload),
    EntryAction(EntryActionPayload),
    EntryItem(EntryItemPayload),
    FormSnapshot(FormSnapshotPayload),
    Registration(RegistrationPayload),
    Validation(ValidationPayload),
    BusinessRule(BusinessRulePayload),
    UiStateChange(UiStateChangePayload),
    FormSubmission(FormSubmissionPayload),
}

impl EventPayload {
    /// Returns the discriminant.
    pub fn kind(&self) -> PayloadKind {
        match self {
            EventPayload::Selection(_) => PayloadKind::Selection,
            EventPayload::SearchRequest(_) => PayloadKind::SearchRequest,
            EventPayload::SearchResult(_) => PayloadKind::SearchResult,
            EventPayload::EntryAction(_) => PayloadKind::EntryAction,
            EventPayload::EntryItem(_) => PayloadKind::EntryItem,
            EventPayload::FormSnapshot(_) => PayloadKind::FormSnapshot,
            EventPayload::Registration(_) => PayloadKind::Registration,
            EventPayload::Validation(_) => PayloadKind::Validation,
            EventPayload::BusinessRule(_) => PayloadKind::BusinessRule,
            EventPayload::UiStateChange(_) => PayloadKind::UiStateChange,
            EventPayload::FormSubmission(_) => PayloadKind::FormSubmission,
        }
    }

    /// Short variant name for log lines.
    pub fn kind_name(&self) -> &'static str {
        match self.kind() {
            PayloadKind::Selection => "Selection",
            PayloadKind::SearchRequest => "SearchRequest",
            PayloadKind::SearchResult => "SearchResult",
            PayloadKind::EntryAction => "EntryAction",
            PayloadKind::EntryItem => "EntryItem",
            PayloadKind::FormSnapshot => "FormSnapshot",
            PayloadKind::Registration => "Registration",
            PayloadKind::Validation => "Validation",
            PayloadKind::BusinessRule => "BusinessRule",
            PayloadKind::UiStateChange => "UiStateChange",
            PayloadKind::FormSubmission => "FormSubmission",
        }
    }

    /// Decodes a JSON payload into the shape `event_type` requires.
    ///
    /// Used where events enter from a string-typed boundary (UI bridge).
    pub fn decode(event_type: EventType, value: Value) -> BusResult<Self> {
        fn decode_as<T: serde::de::DeserializeOwned>(
            event_type: EventType,
            value: Value,
        ) -> BusResult<T> {
            serde_json::from_value(value).map_err(|e| {
                BusError::contract(format!("Invalid payload for {}: {}", event_type, e))
            })
        }

        let payload = match event_type.payload_kind() {
            PayloadKind::Selection => EventPayload::Selection(decode_as(event_type, value)?),
            PayloadKind::SearchRequest => EventPayload::SearchRequest(decode_as(event_type, value)?),
            PayloadKind::SearchResult => EventPayload::SearchResult(decode_as(event_type, value)?),
            PayloadKind::EntryAction => EventPayload::EntryAction(decode_as(event_type, value)?),
            PayloadKind::EntryItem => EventPayload::EntryItem(decode_as(event_type, value)?),
            PayloadKind::FormSnapshot => EventPayload::FormSnapshot(decode_as(event_type, value)?),
            PayloadKind::Registration => EventPayload::Registration(decode_as(event_type, value)?),
            PayloadKind::Validation => EventPayload::Validation(decode_as(event_type, value)?),
            PayloadKind::BusinessRule => EventPayload::BusinessRule(decode_as(event_type, value)?),
            PayloadKind::UiStateChange => EventPayload::UiStateChange(decode_as(event_type, value)?),
            PayloadKind::FormSubmission => EventPayload::FormSubmission(decode_as(event_type, value)?),
        };
        Ok(payload)
    }

    /// Checks the field-level contract of the payload.
    pub fn check_contract(&self) -> BusResult<()> {
        match self {
            EventPayload::SearchResult(p) => {
                if p.results.len() > p.total_results {
                    return Err(BusError::contract(format!(
                        "search result carries {} results but total_results is {}",
                        p.results.len(),
                        p.total_results
                    )));
                }
                if !p.search_duration_ms.is_finite() || p.search_duration_ms < 0.0 {
                    return Err(BusError::contract(
                        "search_duration_ms must be a non-negative number",
                    ));
                }
            }
            EventPayload::Registration(p) if p.entry_id.trim().is_empty() => {
                return Err(BusError::contract("entry_id is required"));
            }
            EventPayload::Validation(p) if !p.is_valid && p.error_messages.is_empty() => {
                return Err(BusError::contract(
                    "a failed validation must carry at least one error message",
                ));
            }
            EventPayload::BusinessRule(p) if p.warnings.is_empty() => {
                return Err(BusError::contract(
                    "a business rule violation must carry at least one warning",
                ));
            }
            EventPayload::UiStateChange(p) if p.widget_name.trim().is_empty() => {
                return Err(BusError::contract("widget_name is required"));
            }
            EventPayload::FormSubmission(p) if !p.validation_status && p.errors.is_empty() => {
                return Err(BusError::contract(
                    "a failed form submission must carry at least one error",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_every_event_type_has_a_decodable_minimal_payload() {
        let minimal = |event_type: EventType| match event_type.payload_kind() {
            PayloadKind::SearchResult => json!({"search_term": "lap"}),
            PayloadKind::EntryAction => json!({"action": "clear"}),
            PayloadKind::EntryItem => json!({"product_id": 1}),
            PayloadKind::Registration => json!({"entry_id": "E-1"}),
            PayloadKind::BusinessRule => json!({"rule_type": "r", "warnings": ["w"]}),
            PayloadKind::UiStateChange => json!({"widget_name": "Form"}),
            PayloadKind::FormSubmission => json!({"form_name": "entry"}),
            _ => json!({}),
        };

        for event_type in EventType::ALL {
            let payload = EventPayload::decode(event_type, minimal(event_type)).unwrap();
            assert_eq!(payload.kind(), event_type.payload_kind(), "{}", event_type);
        }
    }

    #[test]
    fn test_decode_selection() {
        let payload = EventPayload::decode(
            EventType::ProductSelected,
            json!({"product": {"id": 1, "nombre": "Laptop"}, "user_action": "double_click"}),
        )
        .unwrap();

        match payload {
            EventPayload::Selection(p) => {
                assert_eq!(p.product["nombre"], "Laptop");
                assert_eq!(p.user_action.as_deref(), Some("double_click"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_decode_entry_action_defaults() {
        let payload =
            EventPayload::decode(EventType::EntryAction, json!({"action": "add", "quantity": 3}))
                .unwrap();
        match payload {
            EventPayload::EntryAction(p) => {
                assert_eq!(p.action, EntryActionKind::Add);
                assert_eq!(p.movement_type, MovementType::Entrada);
                assert_eq!(p.quantity, Some(3));
                assert!(p.form_state.is_empty());
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_wrong_shapes() {
        let err = EventPayload::decode(EventType::EntryAction, json!({"action": "explode"}))
            .unwrap_err();
        assert!(err.is_contract_violation());

        assert!(EventPayload::decode(EventType::ProductSelected, json!({"product": 5})).is_err());
        assert!(EventPayload::decode(EventType::ProductSelected, json!("text")).is_err());
    }

    #[test]
    fn test_validation_contract() {
        let ok = EventPayload::Validation(ValidationPayload {
            is_valid: true,
            ..Default::default()
        });
        assert!(ok.check_contract().is_ok());

        let empty_failure = EventPayload::Validation(ValidationPayload::default());
        assert!(empty_failure.check_contract().is_err());

        let missing_type = EventPayload::Validation(ValidationPayload {
            validation_type: None,
            is_valid: false,
            error_messages: vec!["bad".into()],
            ..Default::default()
        });
        assert!(missing_type.check_contract().is_ok());
    }

    #[test]
    fn test_search_result_contract() {
        let mut result = SearchResultPayload {
            search_term: "lap".into(),
            results: vec![EntitySnapshot::new(), EntitySnapshot::new()],
            total_results: 1,
            search_duration_ms: 3.5,
            search_source: "db".into(),
        };
        assert!(EventPayload::SearchResult(result.clone()).check_contract().is_err());

        result.total_results = 5;
        assert!(EventPayload::SearchResult(result.clone()).check_contract().is_ok());

        result.search_duration_ms = -1.0;
        assert!(EventPayload::SearchResult(result).check_contract().is_err());
    }

    #[test]
    fn test_other_contracts() {
        let rule = EventPayload::BusinessRule(BusinessRulePayload {
            rule_type: "r".into(),
            is_blocking: false,
            warnings: vec![],
            product: None,
        });
        assert!(rule.check_contract().is_err());

        let ui = EventPayload::UiStateChange(UiStateChangePayload::default());
        assert!(ui.check_contract().is_err());

        let submission = EventPayload::FormSubmission(FormSubmissionPayload {
            form_name: "entry".into(),
            validation_status: false,
            ..Default::default()
        });
        assert!(submission.check_contract().is_err());
    }

    #[test]
    fn test_payload_serializes_without_tag() {
        let payload = EventPayload::EntryAction(EntryActionPayload::new(EntryActionKind::ProductSelected));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["action"], "product_selected");
        assert_eq!(json["movement_type"], "ENTRADA");
        assert!(json.get("EntryAction").is_none());
    }
}
