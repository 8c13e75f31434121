//! # Mediator State
//!
//! What the mediator remembers between events.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       MediatorState Lifecycle                           │
//! │                                                                         │
//! │  build() ──► empty                                                     │
//! │                │                                                        │
//! │                ├── PRODUCT_SELECTED (valid) ──► current_selected        │
//! │                ├── PRODUCT_SEARCH_REQUEST   ──► current_search_term     │
//! │                ├── ENTRY_ACTION             ──► form_state (merged)     │
//! │                ├── ENTRY_ACTION add         ──► entry_lines += line,    │
//! │                │                                current_selected = None │
//! │                ├── ENTRY_ACTION remove      ──► entry_lines -= line     │
//! │                │                                                        │
//! │                └── clear / registered / cleanup() ──► empty            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use inventory_core::{EntitySnapshot, EntryLine, ValidationError};

/// Coordination state owned by one mediator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediatorState {
    /// Last selection that passed structural validation, unaltered.
    pub current_selected: Option<EntitySnapshot>,
    pub current_search_term: Option<String>,
    /// Entry-form fields as last reported by the form.
    pub form_state: EntitySnapshot,
    /// Lines accumulated for the entry being built.
    pub entry_lines: Vec<EntryLine>,
}

impl MediatorState {
    /// Back to the state of a freshly built mediator.
    pub fn reset(&mut self) {
        *self = MediatorState::default();
    }

    /// Overwrites form fields with the ones in `update`.
    pub fn merge_form_state(&mut self, update: &EntitySnapshot) {
        for (key, value) in update {
            self.form_state.insert(key.clone(), value.clone());
        }
    }

    /// Adds `line`, summing quantities when the product is already present.
    ///
    /// Returns the number of distinct lines afterwards. A sum that does not
    /// fit leaves the lines untouched.
    pub fn add_line(&mut self, line: EntryLine) -> Result<usize, ValidationError> {
        match self
            .entry_lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(line.quantity).ok_or_else(|| {
                    ValidationError::TooLarge {
                        field: "quantity".to_string(),
                    }
                })?;
            }
            None => self.entry_lines.push(line),
        }
        Ok(self.entry_lines.len())
    }

    /// Removes the line for `product_id`, if any.
    pub fn remove_line(&mut self, product_id: i64) -> Option<EntryLine> {
        let position = self
            .entry_lines
            .iter()
            .position(|line| line.product_id == product_id)?;
        Some(self.entry_lines.remove(position))
    }

    pub fn is_empty(&self) -> bool {
        *self == MediatorState::default()
    }
}
