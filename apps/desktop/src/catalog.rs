//! # Catalog Seed
//!
//! Fills the mediator's product lookup from a JSON file until a product
//! service is attached.
//!
//! ## File Format
//! ```json
//! [
//!   {"id": 1, "nombre": "Laptop", "categoria_tipo": "MATERIAL", "stock": 15},
//!   {"id_producto": 2, "name": "Instalación", "categoria_tipo": "SERVICIO"}
//! ]
//! ```
//!
//! ## Path Resolution
//! `INVENTORY_CATALOG_PATH` wins; without it the shell starts with an empty
//! catalog and the mediator trusts the snapshots widgets send.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use inventory_core::validation::as_integral;
use inventory_core::{fields, EntitySnapshot};
use inventory_events::InMemoryCatalog;

use crate::error::ApiError;

/// Environment variable naming the seed file.
pub const CATALOG_PATH_ENV: &str = "INVENTORY_CATALOG_PATH";

/// Returns the seed file path from the environment, if set.
pub fn catalog_path_from_env() -> Option<PathBuf> {
    std::env::var(CATALOG_PATH_ENV).ok().map(PathBuf::from)
}

/// Parses a JSON array of product snapshots into a catalog.
///
/// Entries without a usable id are skipped with a warning.
pub fn parse_catalog(contents: &str) -> Result<InMemoryCatalog, ApiError> {
    let entries: Vec<Value> = serde_json::from_str(contents)?;
    let catalog = InMemoryCatalog::new();

    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(snapshot) = entry else {
            warn!(index, "Catalog entry is not an object, skipping");
            continue;
        };
        match snapshot_id(&snapshot) {
            Some(id) => catalog.upsert(id, snapshot),
            None => warn!(index, "Catalog entry has no usable id, skipping"),
        }
    }

    Ok(catalog)
}

/// Reads and parses the seed file at `path`.
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog, ApiError> {
    let contents = std::fs::read_to_string(path)?;
    let catalog = parse_catalog(&contents)?;
    info!(?path, products = catalog.len(), "Catalog seeded");
    Ok(catalog)
}

fn snapshot_id(snapshot: &EntitySnapshot) -> Option<i64> {
    snapshot
        .get(fields::ID)
        .or_else(|| snapshot.get(fields::ID_ALIAS))
        .and_then(as_integral)
        .filter(|id| *id > 0)
}
