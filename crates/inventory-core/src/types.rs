//! # Domain Types
//!
//! Types shared by the widgets, the mediator, and the collaborator services.
//!
//! ## Snapshot Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Product Snapshots                               │
//! │                                                                         │
//! │  Lookup service ──► EntitySnapshot (plain key→value map)               │
//! │                         │                                               │
//! │                         │  validate_product_snapshot()                  │
//! │                         ▼                                               │
//! │                    ProductView (typed, read-only)                      │
//! │                    ───────────────────────────                          │
//! │                    id            ← "id" | "id_producto"                 │
//! │                    name          ← "nombre" | "name"                    │
//! │                    code          ← "code" | id                          │
//! │                    category      ← "category" | "categoria_tipo" |      │
//! │                                    "CAT_<id_categoria>" | "UNKNOWN"     │
//! │                    category_type ← "categoria_tipo"                     │
//! │                                                                         │
//! │  The snapshot itself is never rewritten: the mediator stores and       │
//! │  forwards exactly what the producing widget published.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Plain key→value entity snapshot as produced by lookup services.
pub type EntitySnapshot = serde_json::Map<String, serde_json::Value>;

/// Field names used by the product snapshots of the inventory database.
pub mod fields {
    pub const ID: &str = "id";
    pub const ID_ALIAS: &str = "id_producto";
    pub const NAME: &str = "nombre";
    pub const NAME_ALIAS: &str = "name";
    pub const CODE: &str = "code";
    pub const CATEGORY: &str = "category";
    pub const CATEGORY_ID: &str = "id_categoria";
    pub const CATEGORY_TYPE: &str = "categoria_tipo";
    pub const STOCK: &str = "stock";
}

// =============================================================================
// Category Type
// =============================================================================

/// Category classification of a product.
///
/// Only `Material` products carry physical stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    Material,
    Servicio,
}

impl CategoryType {
    /// Every allowed value, in wire form.
    pub const ALLOWED: [&'static str; 2] = ["MATERIAL", "SERVICIO"];

    /// Returns the wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Material => "MATERIAL",
            CategoryType::Servicio => "SERVICIO",
        }
    }

    /// Parses the exact wire name (case-sensitive, like the database column).
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "MATERIAL" => Some(CategoryType::Material),
            "SERVICIO" => Some(CategoryType::Servicio),
            _ => None,
        }
    }

    /// Returns true if products of this category can hold stock.
    pub const fn is_stockable(&self) -> bool {
        matches!(self, CategoryType::Material)
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// Kind of inventory movement the entry form is building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock coming in.
    #[default]
    Entrada,
    /// Stock going out.
    Salida,
    /// Manual correction.
    Ajuste,
}

impl MovementType {
    /// Returns the wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entrada => "ENTRADA",
            MovementType::Salida => "SALIDA",
            MovementType::Ajuste => "AJUSTE",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ENTRADA" => Ok(MovementType::Entrada),
            "SALIDA" => Ok(MovementType::Salida),
            "AJUSTE" => Ok(MovementType::Ajuste),
            other => Err(format!(
                "Unknown movement type: '{}'. Valid options: ENTRADA, SALIDA, AJUSTE",
                other
            )),
        }
    }
}

// =============================================================================
// Product View
// =============================================================================

/// Typed, read-only view over a structurally valid product snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    /// Business code; falls back to the id when the snapshot has none.
    pub code: String,
    /// Display category; see the module docs for the fallback chain.
    pub category: String,
    pub category_type: Option<CategoryType>,
}

impl ProductView {
    /// Returns true unless the product is known to be a service.
    pub fn is_stockable(&self) -> bool {
        self.category_type.map_or(true, |c| c.is_stockable())
    }
}

// =============================================================================
// Entry Lines
// =============================================================================

/// A product line accumulated by the entry form before registration.
///
/// Adding the same product twice sums the quantities into one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: i64,
    /// Stock reported by the snapshot when the line was created.
    pub original_stock: i64,
    pub category_type: CategoryType,
}

/// Command handed to the persistence collaborator to register an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryCommand {
    pub movement_type: MovementType,
    pub lines: Vec<EntryLine>,
}

/// What the persistence collaborator returns for a registered entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryReceipt {
    pub entry_id: String,
    pub ticket_number: String,
}
