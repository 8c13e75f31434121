//! # Collaborator Traits
//!
//! Services the mediator calls but does not own. Both are optional: without
//! a lookup, adds use the selected snapshot as is; without entry commands,
//! register actions are ignored.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use inventory_core::{EntitySnapshot, EntryCommand, EntryReceipt};

use crate::error::CollaboratorError;

/// Looks up the current snapshot of an entity.
pub trait EntityLookup: Send + Sync {
    /// Returns `Ok(None)` when no entity has this id.
    fn find_by_id(&self, id: i64) -> Result<Option<EntitySnapshot>, CollaboratorError>;
}

/// Persists inventory entries.
pub trait EntryCommands: Send + Sync {
    fn register_entry(&self, command: EntryCommand) -> Result<EntryReceipt, CollaboratorError>;
}

/// Lookup over a fixed set of snapshots, keyed by id.
///
/// Used by the desktop shell before a product service is attached, and by
/// tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<i64, EntitySnapshot>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the snapshot for `id`.
    pub fn upsert(&self, id: i64, snapshot: EntitySnapshot) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, snapshot);
    }

    pub fn remove(&self, id: i64) -> Option<EntitySnapshot> {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn len(&self) -> usize {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityLookup for InMemoryCatalog {
    fn find_by_id(&self, id: i64) -> Result<Option<EntitySnapshot>, CollaboratorError> {
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }
}
