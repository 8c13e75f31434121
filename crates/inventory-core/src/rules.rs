//! # Business Rules
//!
//! Non-blocking checks over a structurally valid snapshot.
//!
//! A rule evaluator maps a snapshot to a (possibly empty) list of warnings.
//! Evaluators are pure: no lookups, no publishing, no state. The mediator
//! decides what to do with the warnings.

use serde_json::Value;

use crate::types::{fields, CategoryType, EntitySnapshot};
use crate::validation::as_integral;

/// Per-entity-type business-rule evaluator.
pub trait BusinessRules: Send + Sync {
    /// Tag published with the warnings (`rule_type` of the violation event).
    fn rule_type(&self) -> &str;

    /// Returns the warnings that apply to `snapshot`.
    fn evaluate(&self, snapshot: &EntitySnapshot) -> Vec<String>;
}

/// Rules for product snapshots on the inventory entry flow.
///
/// ## Rules
/// - `SERVICIO` products hold no physical stock
/// - `stock` below zero is suspicious
/// - `stock` that is not an integer is unreadable
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductRules;

impl BusinessRules for ProductRules {
    fn rule_type(&self) -> &str {
        "product_category_restriction"
    }

    fn evaluate(&self, snapshot: &EntitySnapshot) -> Vec<String> {
        let mut warnings = Vec::new();

        let is_service = snapshot
            .get(fields::CATEGORY_TYPE)
            .and_then(Value::as_str)
            .and_then(CategoryType::from_wire)
            == Some(CategoryType::Servicio);
        if is_service {
            warnings.push(
                "SERVICIO products cannot be added to inventory (they hold no physical stock)"
                    .to_string(),
            );
        }

        if let Some(stock) = snapshot.get(fields::STOCK) {
            match as_integral(stock) {
                Some(s) if s < 0 => warnings.push("Product has negative stock".to_string()),
                Some(_) => {}
                None => warnings.push("Product stock is not a valid number".to_string()),
            }
        }

        warnings
    }
}
