//! # Validation Module
//!
//! Structural validation of the snapshots widgets put on the bus.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Bus boundary (inventory-events)                              │
//! │  ├── Payload variant matches the event type                            │
//! │  └── Envelope contract (source, payload invariants)                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Structural (THIS MODULE) - blocking                          │
//! │  ├── Required fields present                                           │
//! │  ├── Primitive types correct                                           │
//! │  └── Enumerated fields within the allowed set                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Business rules (rules.rs) - warnings only                    │
//! │                                                                         │
//! │  A structural failure stops forwarding; a warning never does.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{fields, CategoryType, EntitySnapshot, EntryLine, ProductView};

/// Result type for single-field validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Snapshot Validation
// =============================================================================

/// Validates a product snapshot and returns its typed view.
///
/// ## Rules
/// - `id` (or `id_producto`) is required and must be a positive integer,
///   given either as a number or as a numeric string
/// - `nombre` (or `name`) is required and must be non-blank text
/// - `categoria_tipo`, when present, must be `MATERIAL` or `SERVICIO`
///
/// Every failing field is reported, in the order above.
///
/// ## Example
/// ```rust
/// use inventory_core::validation::validate_product_snapshot;
/// use serde_json::json;
///
/// let missing_name = json!({"id": 3});
/// let errors = validate_product_snapshot(missing_name.as_object().unwrap()).unwrap_err();
/// assert_eq!(errors.len(), 1);
/// assert_eq!(errors[0].field(), "nombre");
/// ```
pub fn validate_product_snapshot(
    snapshot: &EntitySnapshot,
) -> Result<ProductView, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let id = match present(snapshot, fields::ID, fields::ID_ALIAS) {
        None => {
            errors.push(ValidationError::Required {
                field: fields::ID.to_string(),
            });
            None
        }
        Some(value) => match as_integral(value) {
            Some(id) if id > 0 => Some(id),
            Some(_) => {
                errors.push(ValidationError::MustBePositive {
                    field: fields::ID.to_string(),
                });
                None
            }
            None => {
                errors.push(ValidationError::InvalidFormat {
                    field: fields::ID.to_string(),
                    reason: "product id must be numeric".to_string(),
                });
                None
            }
        },
    };

    let name = match present(snapshot, fields::NAME, fields::NAME_ALIAS) {
        None => {
            errors.push(ValidationError::Required {
                field: fields::NAME.to_string(),
            });
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.push(ValidationError::Required {
                field: fields::NAME.to_string(),
            });
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(ValidationError::InvalidFormat {
                field: fields::NAME.to_string(),
                reason: "must be text".to_string(),
            });
            None
        }
    };

    // Absent is fine; an explicit null is not one of the allowed values.
    let category_type = match snapshot.get(fields::CATEGORY_TYPE) {
        None => None,
        Some(value) => {
            let parsed = value.as_str().and_then(CategoryType::from_wire);
            if parsed.is_none() {
                errors.push(ValidationError::NotAllowed {
                    field: fields::CATEGORY_TYPE.to_string(),
                    allowed: CategoryType::ALLOWED.iter().map(|s| s.to_string()).collect(),
                });
            }
            parsed
        }
    };

    match (id, name) {
        (Some(id), Some(name)) if errors.is_empty() => Ok(ProductView {
            id,
            name,
            code: derive_code(snapshot, id),
            category: derive_category(snapshot),
            category_type,
        }),
        _ => Err(errors),
    }
}

/// Validates the quantity of an entry-form add.
pub fn validate_entry_quantity(quantity: Option<i64>) -> ValidationResult<i64> {
    match quantity {
        None => Err(ValidationError::Required {
            field: "quantity".to_string(),
        }),
        Some(q) if q <= 0 => Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }),
        Some(q) => Ok(q),
    }
}

/// Rejects products that cannot hold stock.
pub fn ensure_stockable(view: &ProductView) -> ValidationResult<()> {
    if view.is_stockable() {
        Ok(())
    } else {
        Err(ValidationError::NotStockable {
            name: view.name.clone(),
        })
    }
}

/// Validates a search term; returns it trimmed.
pub fn validate_search_term(term: &str) -> ValidationResult<String> {
    let term = term.trim();
    if term.is_empty() {
        return Err(ValidationError::Required {
            field: "search_term".to_string(),
        });
    }
    Ok(term.to_string())
}

/// Checks accumulated lines right before an entry is registered.
///
/// Returns one message per problem so the form can list them all.
pub fn check_entry_lines(lines: &[EntryLine]) -> Result<(), Vec<String>> {
    if lines.is_empty() {
        return Err(vec!["No products selected".to_string()]);
    }

    let mut errors = Vec::new();
    for line in lines {
        if line.product_id <= 0 {
            errors.push(format!("{}: invalid id ({})", line.name, line.product_id));
            continue;
        }
        if line.quantity <= 0 {
            errors.push(format!("{}: invalid quantity ({})", line.name, line.quantity));
        }
        if !line.category_type.is_stockable() {
            errors.push(format!("{}: SERVICIO not allowed in inventory", line.name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Interprets a JSON value as an integer, accepting numeric strings.
pub fn as_integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Returns the first non-null value under `key` or its alias.
fn present<'a>(snapshot: &'a EntitySnapshot, key: &str, alias: &str) -> Option<&'a Value> {
    snapshot
        .get(key)
        .filter(|v| !v.is_null())
        .or_else(|| snapshot.get(alias).filter(|v| !v.is_null()))
}

fn derive_code(snapshot: &EntitySnapshot, id: i64) -> String {
    match snapshot.get(fields::CODE) {
        Some(Value::String(code)) if !code.is_empty() => code.clone(),
        _ => id.to_string(),
    }
}

fn derive_category(snapshot: &EntitySnapshot) -> String {
    if let Some(Value::String(category)) = snapshot.get(fields::CATEGORY) {
        return category.clone();
    }
    if let Some(Value::String(kind)) = snapshot.get(fields::CATEGORY_TYPE) {
        return kind.clone();
    }
    match snapshot.get(fields::CATEGORY_ID) {
        Some(id) if !id.is_null() => match id {
            Value::String(s) => format!("CAT_{}", s),
            other => format!("CAT_{}", other),
        },
        _ => "UNKNOWN".to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> EntitySnapshot {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_snapshot() {
        let view = validate_product_snapshot(&snapshot(json!({
            "id": 1,
            "nombre": "Laptop",
            "categoria_tipo": "MATERIAL",
            "stock": 15
        })))
        .unwrap();

        assert_eq!(view.id, 1);
        assert_eq!(view.name, "Laptop");
        assert_eq!(view.code, "1");
        assert_eq!(view.category, "MATERIAL");
        assert_eq!(view.category_type, Some(CategoryType::Material));
    }

    #[test]
    fn test_aliases_and_numeric_strings() {
        let view = validate_product_snapshot(&snapshot(json!({
            "id_producto": "42",
            "name": "Cable",
            "id_categoria": 3,
            "code": "CBL-01"
        })))
        .unwrap();

        assert_eq!(view.id, 42);
        assert_eq!(view.name, "Cable");
        assert_eq!(view.code, "CBL-01");
        assert_eq!(view.category, "CAT_3");
        assert_eq!(view.category_type, None);
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let errors = validate_product_snapshot(&snapshot(json!({"stock": 2}))).unwrap_err();
        let failing: Vec<&str> = errors.iter().map(|e| e.field()).collect();
        assert_eq!(failing, vec!["id", "nombre"]);
    }

    #[test]
    fn test_wrong_types() {
        let errors = validate_product_snapshot(&snapshot(json!({
            "id": "abc",
            "nombre": 17,
            "categoria_tipo": "HERRAMIENTA"
        })))
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::InvalidFormat { .. }));
        assert!(matches!(errors[1], ValidationError::InvalidFormat { .. }));
        assert!(matches!(errors[2], ValidationError::NotAllowed { .. }));
    }

    #[test]
    fn test_null_category_is_not_allowed() {
        let errors = validate_product_snapshot(&snapshot(json!({
            "id": 5,
            "nombre": "Taladro",
            "categoria_tipo": null
        })))
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::NotAllowed { .. }));
        assert_eq!(errors[0].field(), "categoria_tipo");

        let view = validate_product_snapshot(&snapshot(json!({"id": 5, "nombre": "Taladro"})))
            .unwrap();
        assert_eq!(view.category_type, None);
    }

    #[test]
    fn test_blank_name_and_zero_id() {
        let errors = validate_product_snapshot(&snapshot(json!({
            "id": 0,
            "nombre": "   "
        })))
        .unwrap_err();

        assert!(matches!(errors[0], ValidationError::MustBePositive { .. }));
        assert!(matches!(errors[1], ValidationError::Required { .. }));
    }

    #[test]
    fn test_validate_entry_quantity() {
        assert_eq!(validate_entry_quantity(Some(5)).unwrap(), 5);
        assert!(validate_entry_quantity(Some(0)).is_err());
        assert!(validate_entry_quantity(Some(-3)).is_err());
        assert!(validate_entry_quantity(None).is_err());
    }

    #[test]
    fn test_validate_search_term() {
        assert_eq!(validate_search_term("  lap ").unwrap(), "lap");
        assert!(validate_search_term("   ").is_err());
        assert!(validate_search_term("").is_err());
    }

    #[test]
    fn test_check_entry_lines() {
        assert!(check_entry_lines(&[]).is_err());

        let good = EntryLine {
            product_id: 1,
            name: "Laptop".into(),
            quantity: 2,
            original_stock: 15,
            category_type: CategoryType::Material,
        };
        assert!(check_entry_lines(&[good.clone()]).is_ok());

        let service = EntryLine {
            product_id: 2,
            name: "Soporte".into(),
            quantity: 0,
            category_type: CategoryType::Servicio,
            ..good
        };
        let errors = check_entry_lines(&[service]).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_as_integral() {
        assert_eq!(as_integral(&json!(5)), Some(5));
        assert_eq!(as_integral(&json!(5.0)), Some(5));
        assert_eq!(as_integral(&json!(5.5)), None);
        assert_eq!(as_integral(&json!(" 12 ")), Some(12));
        assert_eq!(as_integral(&json!(true)), None);
    }
}
