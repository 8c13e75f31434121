//! # Mediator
//!
//! Centralises cross-widget coordination: validates product selections,
//! forwards search requests to the widget that owns searching, and turns
//! entry-form actions into entry lines and registrations.
//!
//! ## Event Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mediator Event Handling                          │
//! │                                                                         │
//! │  PRODUCT_SELECTED                                                      │
//! │  ────────────────                                                      │
//! │  empty snapshot ──► ignored                                            │
//! │  structural check fails ──► VALIDATION_ERROR (product_data), stop      │
//! │  business rules warn ──► BUSINESS_RULE_VIOLATION (is_blocking=false)   │
//! │  current_selected = snapshot ──► ENTRY_ACTION (product_selected)       │
//! │                                                                         │
//! │  PRODUCT_SEARCH_REQUEST                                                │
//! │  ──────────────────────                                                │
//! │  blank term ──► ignored                                                │
//! │  record term; unless sent by the search owner or by the mediator       │
//! │  itself ──► re-publish with requester "<mediator> (from <origin>)"     │
//! │                                                                         │
//! │  ENTRY_ACTION (from the form)                                          │
//! │  ────────────────────────────                                          │
//! │  merge form_state, then:                                               │
//! │    clear    ──► reset ──► ENTRY_FORM_CLEARED                           │
//! │    add      ──► checks ──► ENTRY_ITEM_ADDED | VALIDATION_ERROR         │
//! │    remove   ──► ENTRY_ITEM_REMOVED                                     │
//! │    validate ──► ENTRY_VALIDATION_REQUESTED                             │
//! │    register ──► EntryCommands ──► ENTRY_REGISTERED | VALIDATION_ERROR  │
//! │                                                                         │
//! │  VALIDATION_RESULT ──► logged; failures without validation_type are    │
//! │                        warned about and dropped                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! The state lock is never held while publishing. Without a host loop the bus
//! delivers synchronously, so a publish can re-enter any handler here.
//!
//! ## Lifetime
//! Listeners hold a `Weak` reference to the mediator. [`Mediator::cleanup`]
//! (also run on drop) unregisters them and resets the state.

mod collaborators;
mod state;

pub use collaborators::{EntityLookup, EntryCommands, InMemoryCatalog};
pub use state::MediatorState;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use inventory_core::validation::{
    as_integral, check_entry_lines, ensure_stockable, validate_entry_quantity,
    validate_product_snapshot, validate_search_term,
};
use inventory_core::{
    fields, BusinessRules, CategoryType, CoreError, EntitySnapshot, EntryCommand, EntryLine,
    MovementType, ProductRules, ValidationError,
};

use crate::bus::EventBus;
use crate::config::MediatorSettings;
use crate::error::{BusError, BusResult, MediatorError, MediatorResult};
use crate::event::{EventData, EventType};
use crate::listener::Listener;
use crate::payload::{
    BusinessRulePayload, EntryActionKind, EntryActionPayload, EntryItemPayload, EventPayload,
    FormSnapshotPayload, RegistrationPayload, SearchRequestPayload, ValidationPayload,
};

const PRODUCT_DATA: &str = "product_data";
const ENTRY_ITEM: &str = "entry_item";
const ENTRY_REGISTRATION: &str = "entry_registration";

type Handler = fn(&MediatorInner, &EventData) -> MediatorResult<()>;

// =============================================================================
// Builder
// =============================================================================

/// Configures and registers a [`Mediator`].
pub struct MediatorBuilder {
    bus: EventBus,
    settings: MediatorSettings,
    rules: Box<dyn BusinessRules>,
    lookup: Option<Arc<dyn EntityLookup>>,
    commands: Option<Arc<dyn EntryCommands>>,
}

impl MediatorBuilder {
    pub fn settings(mut self, settings: MediatorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replaces the default [`ProductRules`].
    pub fn rules(mut self, rules: impl BusinessRules + 'static) -> Self {
        self.rules = Box::new(rules);
        self
    }

    pub fn lookup(mut self, lookup: Arc<dyn EntityLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn commands(mut self, commands: Arc<dyn EntryCommands>) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Registers the mediator's listeners on the bus.
    pub fn build(self) -> BusResult<Mediator> {
        if self.settings.source_name.trim().is_empty() {
            return Err(BusError::InvalidConfig(
                "mediator source_name must not be empty".into(),
            ));
        }

        let inner = Arc::new(MediatorInner {
            bus: self.bus,
            settings: self.settings,
            rules: self.rules,
            lookup: self.lookup,
            commands: self.commands,
            state: Mutex::new(MediatorState::default()),
            listeners: Mutex::new(Vec::new()),
        });

        let handlers: [(EventType, &str, Handler); 4] = [
            (
                EventType::ProductSelected,
                "mediator:product_selected",
                MediatorInner::handle_product_selected,
            ),
            (
                EventType::ProductSearchRequest,
                "mediator:search_request",
                MediatorInner::handle_search_request,
            ),
            (
                EventType::EntryAction,
                "mediator:entry_action",
                MediatorInner::handle_entry_action,
            ),
            (
                EventType::ValidationResult,
                "mediator:validation_result",
                MediatorInner::handle_validation_result,
            ),
        ];

        let mut registered = Vec::with_capacity(handlers.len());
        for (event_type, label, handler) in handlers {
            let listener = listener_for(Arc::downgrade(&inner), label, handler);
            inner.bus.register(event_type, listener.clone());
            registered.push((event_type, listener));
        }
        *inner.listeners() = registered;

        info!(
            source_name = %inner.settings.source_name,
            search_owner = %inner.settings.search_owner,
            lookup = inner.lookup.is_some(),
            commands = inner.commands.is_some(),
            "Mediator registered"
        );

        Ok(Mediator { inner })
    }
}

/// Wraps a handler so its errors are logged and never reach the bus.
fn listener_for(mediator: Weak<MediatorInner>, label: &str, handler: Handler) -> Listener {
    Listener::new(label, move |event| {
        let Some(inner) = mediator.upgrade() else {
            return Ok(());
        };
        match handler(&inner, event) {
            Ok(()) => {}
            Err(err @ MediatorError::MissingDiscriminator { .. }) => {
                warn!(
                    event_type = %event.event_type,
                    source = %event.source,
                    error = %err,
                    "Ignoring malformed event"
                );
            }
            Err(err) => {
                error!(
                    event_type = %event.event_type,
                    source = %event.source,
                    error = %err,
                    "Mediator handler failed"
                );
            }
        }
        Ok(())
    })
}

// =============================================================================
// Mediator
// =============================================================================

/// Owner handle of a registered mediator. Dropping it unregisters it.
pub struct Mediator {
    inner: Arc<MediatorInner>,
}

struct MediatorInner {
    bus: EventBus,
    settings: MediatorSettings,
    rules: Box<dyn BusinessRules>,
    lookup: Option<Arc<dyn EntityLookup>>,
    commands: Option<Arc<dyn EntryCommands>>,
    state: Mutex<MediatorState>,
    listeners: Mutex<Vec<(EventType, Listener)>>,
}

impl Mediator {
    /// Starts configuring a mediator on `bus`.
    pub fn builder(bus: EventBus) -> MediatorBuilder {
        MediatorBuilder {
            bus,
            settings: MediatorSettings::default(),
            rules: Box::new(ProductRules),
            lookup: None,
            commands: None,
        }
    }

    /// Builds a mediator with default settings and rules.
    pub fn new(bus: EventBus) -> BusResult<Mediator> {
        Self::builder(bus).build()
    }

    pub fn settings(&self) -> &MediatorSettings {
        &self.inner.settings
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn current_selected(&self) -> Option<EntitySnapshot> {
        self.inner.state().current_selected.clone()
    }

    pub fn current_search_term(&self) -> Option<String> {
        self.inner.state().current_search_term.clone()
    }

    pub fn form_state(&self) -> EntitySnapshot {
        self.inner.state().form_state.clone()
    }

    pub fn entry_lines(&self) -> Vec<EntryLine> {
        self.inner.state().entry_lines.clone()
    }

    /// Copy of the whole coordination state.
    pub fn state(&self) -> MediatorState {
        self.inner.state().clone()
    }

    /// Returns true while the mediator's listeners are registered.
    pub fn is_active(&self) -> bool {
        !self.inner.listeners().is_empty()
    }

    /// Unregisters every listener and resets the state. Idempotent.
    pub fn cleanup(&self) {
        let listeners = std::mem::take(&mut *self.inner.listeners());
        if listeners.is_empty() {
            return;
        }
        for (event_type, listener) in &listeners {
            self.inner.bus.unregister(*event_type, listener);
        }
        self.inner.state().reset();
        info!(
            source_name = %self.inner.settings.source_name,
            "Mediator cleaned up"
        );
    }
}

impl Drop for Mediator {
    fn drop(&mut self) {
        self.cleanup();
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("settings", &self.inner.settings)
            .field("state", &self.state())
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// Handlers
// =============================================================================

impl MediatorInner {
    fn state(&self) -> MutexGuard<'_, MediatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<(EventType, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event_type: EventType, payload: EventPayload) -> MediatorResult<()> {
        self.bus
            .publish(event_type, payload, self.settings.source_name.as_str())?;
        Ok(())
    }

    fn is_own(&self, event: &EventData) -> bool {
        event.source == self.settings.source_name
    }

    // -------------------------------------------------------------------------
    // Product selection
    // -------------------------------------------------------------------------

    fn handle_product_selected(&self, event: &EventData) -> MediatorResult<()> {
        let EventPayload::Selection(selection) = &event.payload else {
            return Err(unexpected_payload(event));
        };
        let snapshot = &selection.product;

        if snapshot.is_empty() {
            debug!(source = %event.source, "Selection without product data, ignoring");
            return Ok(());
        }

        let view = match validate_product_snapshot(snapshot) {
            Ok(view) => view,
            Err(errors) => {
                warn!(
                    source = %event.source,
                    errors = errors.len(),
                    "Product selection failed validation"
                );
                return self.publish_field_errors(PRODUCT_DATA, &errors, snapshot);
            }
        };

        let warnings = self.rules.evaluate(snapshot);
        if !warnings.is_empty() {
            debug!(product_id = view.id, warnings = warnings.len(), "Business rule warnings");
            // Non-blocking: the selection still applies if the warning is not delivered.
            if let Err(err) = self.publish(
                EventType::BusinessRuleViolation,
                EventPayload::BusinessRule(BusinessRulePayload {
                    rule_type: self.rules.rule_type().to_string(),
                    is_blocking: false,
                    warnings,
                    product: Some(snapshot.clone()),
                }),
            ) {
                warn!(
                    product_id = view.id,
                    error = %err,
                    "Business rule warning not delivered"
                );
            }
        }

        let form_state = {
            let mut state = self.state();
            state.current_selected = Some(snapshot.clone());
            state.form_state.clone()
        };

        self.publish(
            EventType::EntryAction,
            EventPayload::EntryAction(EntryActionPayload {
                action: EntryActionKind::ProductSelected,
                movement_type: self.settings.default_movement_type,
                product: Some(snapshot.clone()),
                quantity: None,
                form_state,
            }),
        )?;

        info!(
            product_id = view.id,
            code = %view.code,
            origin = %event.source,
            "Product selection applied"
        );
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Search requests
    // -------------------------------------------------------------------------

    fn handle_search_request(&self, event: &EventData) -> MediatorResult<()> {
        let EventPayload::SearchRequest(request) = &event.payload else {
            return Err(unexpected_payload(event));
        };

        let Ok(term) = validate_search_term(&request.search_term) else {
            debug!(source = %event.source, "Blank search term, ignoring");
            return Ok(());
        };

        self.state().current_search_term = Some(term.clone());

        if event.source == self.settings.search_owner || self.is_own(event) {
            debug!(source = %event.source, term = %term, "Search request not forwarded");
            return Ok(());
        }

        self.publish(
            EventType::ProductSearchRequest,
            EventPayload::SearchRequest(SearchRequestPayload {
                search_term: term.clone(),
                search_type: request.search_type,
                filters: request.filters.clone(),
                requester: Some(format!(
                    "{} (from {})",
                    self.settings.source_name, event.source
                )),
            }),
        )?;

        debug!(term = %term, origin = %event.source, "Search request forwarded");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Entry form actions
    // -------------------------------------------------------------------------

    fn handle_entry_action(&self, event: &EventData) -> MediatorResult<()> {
        let EventPayload::EntryAction(action) = &event.payload else {
            return Err(unexpected_payload(event));
        };

        // Own "selection applied" notices come back through the bus.
        if self.is_own(event) {
            return Ok(());
        }

        self.state().merge_form_state(&action.form_state);
        debug!(action = %action.action, source = %event.source, "Entry action");

        match action.action {
            EntryActionKind::Clear => self.clear_form(),
            EntryActionKind::Add => self.add_item(action),
            EntryActionKind::Remove => self.remove_item(action),
            EntryActionKind::Validate => self.request_validation(),
            EntryActionKind::Register => self.register_entry(action.movement_type),
            EntryActionKind::Update | EntryActionKind::ProductSelected => Ok(()),
        }
    }

    fn clear_form(&self) -> MediatorResult<()> {
        self.state().reset();
        info!("Entry form cleared");
        self.publish(
            EventType::EntryFormCleared,
            EventPayload::FormSnapshot(FormSnapshotPayload::default()),
        )
    }

    fn add_item(&self, action: &EntryActionPayload) -> MediatorResult<()> {
        let selected = action
            .product
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| self.state().current_selected.clone());
        let Some(mut snapshot) = selected else {
            return self.reject(ENTRY_ITEM, CoreError::NoSelection, None);
        };

        let quantity = match validate_entry_quantity(action.quantity) {
            Ok(q) => q,
            Err(err) => {
                let value = action.quantity.map(Value::from);
                return self.reject(ENTRY_ITEM, err.into(), value);
            }
        };

        let mut view = match validate_product_snapshot(&snapshot) {
            Ok(view) => view,
            Err(errors) => return self.publish_field_errors(ENTRY_ITEM, &errors, &snapshot),
        };

        if let Some(lookup) = &self.lookup {
            match lookup.find_by_id(view.id) {
                Err(err) => {
                    error!(product_id = view.id, error = %err, "Product lookup failed");
                    return self.publish(
                        EventType::ValidationError,
                        EventPayload::Validation(ValidationPayload {
                            field_name: Some(fields::ID.to_string()),
                            field_value: Some(Value::from(view.id)),
                            validator_source: Some(self.settings.source_name.clone()),
                            ..ValidationPayload::failure(ENTRY_ITEM, vec![err.to_string()])
                        }),
                    );
                }
                Ok(None) => {
                    return self.reject(
                        ENTRY_ITEM,
                        CoreError::ProductNotFound(view.id),
                        Some(Value::from(view.id)),
                    );
                }
                Ok(Some(fresh)) => {
                    view = match validate_product_snapshot(&fresh) {
                        Ok(view) => view,
                        Err(errors) => {
                            return self.publish_field_errors(ENTRY_ITEM, &errors, &fresh)
                        }
                    };
                    snapshot = fresh;
                }
            }
        }

        if let Err(err) = ensure_stockable(&view) {
            return self.reject(ENTRY_ITEM, err.into(), Some(Value::Object(snapshot)));
        }

        let line = EntryLine {
            product_id: view.id,
            name: view.name.clone(),
            quantity,
            original_stock: snapshot.get(fields::STOCK).and_then(as_integral).unwrap_or(0),
            category_type: view.category_type.unwrap_or(CategoryType::Material),
        };

        let added = {
            let mut state = self.state();
            let added = state.add_line(line);
            if added.is_ok() {
                state.current_selected = None;
            }
            added
        };
        let total_lines = match added {
            Ok(total) => total,
            Err(err) => return self.reject(ENTRY_ITEM, err.into(), Some(Value::from(quantity))),
        };

        info!(product_id = view.id, quantity, total_lines, "Entry line added");
        self.publish(
            EventType::EntryItemAdded,
            EventPayload::EntryItem(EntryItemPayload {
                product_id: view.id,
                product: Some(snapshot),
                quantity,
                movement_type: action.movement_type,
                total_lines,
            }),
        )
    }

    fn remove_item(&self, action: &EntryActionPayload) -> MediatorResult<()> {
        let product_id = action.product.as_ref().and_then(|p| {
            p.get(fields::ID)
                .or_else(|| p.get(fields::ID_ALIAS))
                .and_then(as_integral)
        });
        let Some(product_id) = product_id else {
            let err = ValidationError::Required {
                field: fields::ID.to_string(),
            };
            return self.reject(ENTRY_ITEM, err.into(), None);
        };

        let (removed, total_lines) = {
            let mut state = self.state();
            let removed = state.remove_line(product_id);
            (removed, state.entry_lines.len())
        };

        let Some(removed) = removed else {
            debug!(product_id, "No entry line to remove");
            return Ok(());
        };

        info!(product_id, total_lines, "Entry line removed");
        self.publish(
            EventType::EntryItemRemoved,
            EventPayload::EntryItem(EntryItemPayload {
                product_id,
                product: action.product.clone(),
                quantity: removed.quantity,
                movement_type: action.movement_type,
                total_lines,
            }),
        )
    }

    fn request_validation(&self) -> MediatorResult<()> {
        let payload = {
            let state = self.state();
            FormSnapshotPayload {
                form_state: state.form_state.clone(),
                selected: state.current_selected.clone(),
                lines: state.entry_lines.clone(),
            }
        };
        self.publish(
            EventType::EntryValidationRequested,
            EventPayload::FormSnapshot(payload),
        )
    }

    fn register_entry(&self, movement_type: MovementType) -> MediatorResult<()> {
        let Some(commands) = &self.commands else {
            debug!("No entry command handler configured, ignoring register");
            return Ok(());
        };

        let lines = self.state().entry_lines.clone();
        if let Err(messages) = check_entry_lines(&lines) {
            warn!(problems = messages.len(), "Entry rejected before registration");
            return self.publish(
                EventType::ValidationError,
                EventPayload::Validation(ValidationPayload {
                    field_name: Some("entry_lines".to_string()),
                    validator_source: Some(self.settings.source_name.clone()),
                    ..ValidationPayload::failure(ENTRY_REGISTRATION, messages)
                }),
            );
        }

        let line_count = lines.len();
        match commands.register_entry(EntryCommand {
            movement_type,
            lines,
        }) {
            Ok(receipt) => {
                self.state().reset();
                info!(
                    entry_id = %receipt.entry_id,
                    ticket = %receipt.ticket_number,
                    line_count,
                    "Entry registered"
                );
                self.publish(
                    EventType::EntryRegistered,
                    EventPayload::Registration(RegistrationPayload {
                        entry_id: receipt.entry_id,
                        ticket_number: receipt.ticket_number,
                        line_count,
                    }),
                )
            }
            Err(err) => {
                error!(error = %err, "Entry registration failed");
                self.publish(
                    EventType::ValidationError,
                    EventPayload::Validation(ValidationPayload {
                        validator_source: Some(self.settings.source_name.clone()),
                        ..ValidationPayload::failure(ENTRY_REGISTRATION, vec![err.to_string()])
                    }),
                )
            }
        }
    }

    // -------------------------------------------------------------------------
    // Validation results
    // -------------------------------------------------------------------------

    fn handle_validation_result(&self, event: &EventData) -> MediatorResult<()> {
        let EventPayload::Validation(result) = &event.payload else {
            return Err(unexpected_payload(event));
        };

        if result.is_valid {
            info!(
                validation_type = result.validation_type.as_deref().unwrap_or("-"),
                source = %event.source,
                "Validation passed"
            );
            return Ok(());
        }

        warn!(
            validation_type = result.validation_type.as_deref().unwrap_or("-"),
            source = %event.source,
            errors = result.error_messages.len(),
            "Validation failed"
        );
        self.handle_validation_failure(result, &event.source)
    }

    fn handle_validation_failure(
        &self,
        result: &ValidationPayload,
        source: &str,
    ) -> MediatorResult<()> {
        let Some(validation_type) = result.validation_type.as_deref() else {
            return Err(MediatorError::MissingDiscriminator {
                source_name: source.to_string(),
            });
        };
        for message in &result.error_messages {
            debug!(validation_type, message = %message, "Validation failure");
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Error publishing
    // -------------------------------------------------------------------------

    /// One VALIDATION_ERROR naming the first failing field and every message.
    fn publish_field_errors(
        &self,
        validation_type: &str,
        errors: &[ValidationError],
        snapshot: &EntitySnapshot,
    ) -> MediatorResult<()> {
        let mut payload = ValidationPayload::failure(
            validation_type,
            errors.iter().map(ToString::to_string).collect(),
        );
        payload.field_name = errors.first().map(|e| e.field().to_string());
        payload.field_value = Some(Value::Object(snapshot.clone()));
        payload.validator_source = Some(self.settings.source_name.clone());
        self.publish(EventType::ValidationError, EventPayload::Validation(payload))
    }

    fn reject(
        &self,
        validation_type: &str,
        err: CoreError,
        field_value: Option<Value>,
    ) -> MediatorResult<()> {
        warn!(validation_type, field = err.field(), error = %err, "Entry action rejected");
        let mut payload = ValidationPayload::failure(validation_type, vec![err.to_string()]);
        payload.field_name = Some(err.field().to_string());
        payload.field_value = field_value;
        payload.validator_source = Some(self.settings.source_name.clone());
        self.publish(EventType::ValidationError, EventPayload::Validation(payload))
    }
}

fn unexpected_payload(event: &EventData) -> MediatorError {
    MediatorError::UnexpectedPayload {
        event_type: event.event_type.as_str(),
        actual: event.payload.kind_name(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::host_loop::HostLoop;
    use crate::payload::{SelectionPayload, UiStateChangePayload};
    use inventory_core::EntryReceipt;
    use serde_json::json;

    type Log = Arc<Mutex<Vec<EventData>>>;

    /// Records every event published on `bus`.
    fn capture(bus: &EventBus) -> Log {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        for event_type in EventType::ALL {
            let log = log.clone();
            bus.subscribe(event_type, "capture", move |event| {
                log.lock().unwrap().push(event.clone());
                Ok(())
            });
        }
        log
    }

    fn events(log: &Log, event_type: EventType) -> Vec<EventData> {
        log.lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    fn snapshot(value: Value) -> EntitySnapshot {
        value.as_object().cloned().unwrap()
    }

    fn laptop() -> EntitySnapshot {
        snapshot(json!({"id": 1, "nombre": "Laptop", "categoria_tipo": "MATERIAL", "stock": 15}))
    }

    fn select(bus: &EventBus, product: EntitySnapshot) {
        bus.publish(
            EventType::ProductSelected,
            EventPayload::Selection(SelectionPayload {
                product,
                user_action: None,
            }),
            "SearchWidget",
        )
        .unwrap();
    }

    fn act(bus: &EventBus, action: EntryActionPayload) {
        bus.publish(EventType::EntryAction, EventPayload::EntryAction(action), "EntryForm")
            .unwrap();
    }

    fn add(quantity: i64) -> EntryActionPayload {
        EntryActionPayload {
            quantity: Some(quantity),
            ..EntryActionPayload::new(EntryActionKind::Add)
        }
    }

    fn validation(event: &EventData) -> &ValidationPayload {
        match &event.payload {
            EventPayload::Validation(p) => p,
            other => panic!("expected validation payload, got {:?}", other),
        }
    }

    fn entry_item(event: &EventData) -> &EntryItemPayload {
        match &event.payload {
            EventPayload::EntryItem(p) => p,
            other => panic!("expected entry item payload, got {:?}", other),
        }
    }

    struct FakeCommands {
        received: Mutex<Vec<EntryCommand>>,
        fail: bool,
    }

    impl FakeCommands {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(FakeCommands {
                received: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl EntryCommands for FakeCommands {
        fn register_entry(&self, command: EntryCommand) -> Result<EntryReceipt, CollaboratorError> {
            if self.fail {
                return Err(CollaboratorError::Unavailable("database locked".into()));
            }
            self.received.lock().unwrap().push(command);
            Ok(EntryReceipt {
                entry_id: "E-100".into(),
                ticket_number: "T-0001".into(),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    #[test]
    fn test_valid_selection_is_applied_and_announced() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, laptop());

        assert_eq!(mediator.current_selected(), Some(laptop()));

        let derived = events(&log, EventType::EntryAction);
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].source, "Mediator");
        match &derived[0].payload {
            EventPayload::EntryAction(p) => {
                assert_eq!(p.action, EntryActionKind::ProductSelected);
                assert_eq!(p.product, Some(laptop()));
                assert_eq!(p.movement_type, MovementType::Entrada);
            }
            other => panic!("unexpected payload {:?}", other),
        }

        assert!(events(&log, EventType::ValidationError).is_empty());
        assert!(events(&log, EventType::BusinessRuleViolation).is_empty());
    }

    #[test]
    fn test_json_selection_from_widget() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        bus.publish_json(
            "PRODUCT_SELECTED",
            json!({"product": {"id": 1, "nombre": "Laptop", "categoria_tipo": "MATERIAL", "stock": 15}}),
            "SearchWidget",
        )
        .unwrap();

        assert_eq!(mediator.current_selected(), Some(laptop()));
        assert_eq!(events(&log, EventType::EntryAction).len(), 1);
    }

    #[test]
    fn test_invalid_selection_blocks_forwarding() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, snapshot(json!({"id": 1, "stock": 4})));

        let errors = events(&log, EventType::ValidationError);
        assert_eq!(errors.len(), 1);
        let payload = validation(&errors[0]);
        assert_eq!(payload.validation_type.as_deref(), Some("product_data"));
        assert_eq!(payload.field_name.as_deref(), Some("nombre"));
        assert!(!payload.is_valid);
        assert_eq!(payload.error_messages.len(), 1);
        assert_eq!(
            payload.field_value,
            Some(json!({"id": 1, "stock": 4}))
        );

        assert!(events(&log, EventType::EntryAction).is_empty());
        assert!(mediator.current_selected().is_none());
    }

    #[test]
    fn test_business_rule_warning_does_not_block() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        let service = snapshot(json!({"id": 2, "nombre": "Instalación", "categoria_tipo": "SERVICIO"}));
        select(&bus, service.clone());

        let violations = events(&log, EventType::BusinessRuleViolation);
        assert_eq!(violations.len(), 1);
        match &violations[0].payload {
            EventPayload::BusinessRule(p) => {
                assert!(!p.is_blocking);
                assert_eq!(p.rule_type, "product_category_restriction");
                assert!(!p.warnings.is_empty());
            }
            other => panic!("unexpected payload {:?}", other),
        }

        assert_eq!(events(&log, EventType::EntryAction).len(), 1);
        assert_eq!(mediator.current_selected(), Some(service));
    }

    #[test]
    fn test_rule_warning_not_blocked_by_full_host_loop() {
        let bus = EventBus::new();
        let (mut host, handle) = HostLoop::new(1);
        bus.bind_host_loop(handle);

        // Registered ahead of the mediator so the queue is full by the time it runs.
        let filler = bus.clone();
        bus.subscribe(EventType::ProductSelected, "status-bar", move |_| {
            let _ = filler.publish(
                EventType::UiStateChange,
                EventPayload::UiStateChange(UiStateChangePayload {
                    widget_name: "Form".into(),
                    ..Default::default()
                }),
                "StatusBar",
            );
            Ok(())
        });
        let mediator = Mediator::new(bus.clone()).unwrap();

        let service = snapshot(json!({"id": 2, "nombre": "Instalación", "categoria_tipo": "SERVICIO"}));
        select(&bus, service.clone());
        assert_eq!(host.run_pending(), 1);

        assert_eq!(mediator.current_selected(), Some(service));
        assert_eq!(bus.stats().faults, 0);
    }

    #[test]
    fn test_empty_selection_is_ignored() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, EntitySnapshot::new());

        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(mediator.state().is_empty());
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    fn search(bus: &EventBus, term: &str, source: &str) {
        bus.publish(
            EventType::ProductSearchRequest,
            EventPayload::SearchRequest(SearchRequestPayload {
                search_term: term.into(),
                ..Default::default()
            }),
            source,
        )
        .unwrap();
    }

    #[test]
    fn test_blank_search_term_is_not_forwarded() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        search(&bus, "", "Widget");
        search(&bus, "   ", "Widget");

        assert_eq!(events(&log, EventType::ProductSearchRequest).len(), 2);
        assert!(mediator.current_search_term().is_none());
    }

    #[test]
    fn test_search_request_is_forwarded_once() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        search(&bus, " laptop ", "EntryForm");

        let requests = events(&log, EventType::ProductSearchRequest);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].source, "Mediator");
        match &requests[1].payload {
            EventPayload::SearchRequest(p) => {
                assert_eq!(p.search_term, "laptop");
                assert_eq!(p.requester.as_deref(), Some("Mediator (from EntryForm)"));
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(mediator.current_search_term().as_deref(), Some("laptop"));
    }

    #[test]
    fn test_search_owner_requests_are_not_forwarded() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        search(&bus, "cable", "ProductSearchWidget");

        assert_eq!(events(&log, EventType::ProductSearchRequest).len(), 1);
        assert_eq!(mediator.current_search_term().as_deref(), Some("cable"));
    }

    // -------------------------------------------------------------------------
    // Entry actions
    // -------------------------------------------------------------------------

    #[test]
    fn test_add_builds_entry_lines() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, laptop());
        act(&bus, add(3));

        let added = events(&log, EventType::EntryItemAdded);
        assert_eq!(added.len(), 1);
        let item = entry_item(&added[0]);
        assert_eq!(item.product_id, 1);
        assert_eq!(item.quantity, 3);
        assert_eq!(item.total_lines, 1);
        assert!(mediator.current_selected().is_none());

        select(&bus, laptop());
        act(&bus, add(2));

        let lines = mediator.entry_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
        assert_eq!(lines[0].original_stock, 15);
        assert_eq!(lines[0].name, "Laptop");
    }

    #[test]
    fn test_add_rejections() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        act(&bus, add(1));
        select(&bus, laptop());
        act(&bus, add(0));

        let errors = events(&log, EventType::ValidationError);
        assert_eq!(errors.len(), 2);
        assert_eq!(validation(&errors[0]).field_name.as_deref(), Some("product"));
        assert_eq!(validation(&errors[1]).field_name.as_deref(), Some("quantity"));
        assert_eq!(validation(&errors[1]).validation_type.as_deref(), Some("entry_item"));

        assert!(mediator.entry_lines().is_empty());
        assert_eq!(mediator.current_selected(), Some(laptop()));
    }

    #[test]
    fn test_service_products_cannot_be_added() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(
            &bus,
            snapshot(json!({"id": 2, "nombre": "Instalación", "categoria_tipo": "SERVICIO"})),
        );
        act(&bus, add(1));

        let errors = events(&log, EventType::ValidationError);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            validation(&errors[0]).field_name.as_deref(),
            Some("categoria_tipo")
        );
        assert!(events(&log, EventType::EntryItemAdded).is_empty());
        assert!(mediator.entry_lines().is_empty());
    }

    #[test]
    fn test_add_refreshes_through_lookup() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.upsert(
            1,
            snapshot(json!({"id": 1, "nombre": "Laptop Pro", "categoria_tipo": "MATERIAL", "stock": 40})),
        );
        let mediator = Mediator::builder(bus.clone())
            .lookup(catalog.clone())
            .build()
            .unwrap();

        select(&bus, laptop());
        act(&bus, add(1));

        let lines = mediator.entry_lines();
        assert_eq!(lines[0].name, "Laptop Pro");
        assert_eq!(lines[0].original_stock, 40);

        catalog.remove(1);
        select(&bus, laptop());
        act(&bus, add(1));

        let errors = events(&log, EventType::ValidationError);
        assert_eq!(errors.len(), 1);
        assert!(validation(&errors[0]).error_messages[0].contains("not found"));
        assert_eq!(mediator.entry_lines()[0].quantity, 1);
    }

    #[test]
    fn test_add_quantity_overflow_is_rejected() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, laptop());
        act(&bus, add(i64::MAX));
        select(&bus, laptop());
        act(&bus, add(i64::MAX));

        let errors = events(&log, EventType::ValidationError);
        assert_eq!(errors.len(), 1);
        let rejected = validation(&errors[0]);
        assert_eq!(rejected.validation_type.as_deref(), Some("entry_item"));
        assert_eq!(rejected.field_name.as_deref(), Some("quantity"));

        assert_eq!(bus.stats().faults, 0);
        let lines = mediator.entry_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, i64::MAX);
        assert_eq!(mediator.current_selected(), Some(laptop()));
    }

    #[test]
    fn test_remove_line() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, laptop());
        act(&bus, add(2));

        let remove = |id: i64| EntryActionPayload {
            product: Some(snapshot(json!({"id": id}))),
            ..EntryActionPayload::new(EntryActionKind::Remove)
        };
        act(&bus, remove(99));
        assert!(events(&log, EventType::EntryItemRemoved).is_empty());

        act(&bus, remove(1));
        let removed = events(&log, EventType::EntryItemRemoved);
        assert_eq!(removed.len(), 1);
        assert_eq!(entry_item(&removed[0]).quantity, 2);
        assert_eq!(entry_item(&removed[0]).total_lines, 0);
        assert!(mediator.entry_lines().is_empty());
    }

    #[test]
    fn test_form_state_merge_clear_and_validate() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        act(
            &bus,
            EntryActionPayload {
                form_state: snapshot(json!({"supplier": "ACME", "notes": "urgent"})),
                ..EntryActionPayload::new(EntryActionKind::Update)
            },
        );
        assert_eq!(mediator.form_state()["supplier"], "ACME");

        select(&bus, laptop());
        act(&bus, add(1));
        act(&bus, EntryActionPayload::new(EntryActionKind::Validate));

        let requested = events(&log, EventType::EntryValidationRequested);
        assert_eq!(requested.len(), 1);
        match &requested[0].payload {
            EventPayload::FormSnapshot(p) => {
                assert_eq!(p.lines.len(), 1);
                assert_eq!(p.form_state["notes"], "urgent");
            }
            other => panic!("unexpected payload {:?}", other),
        }

        act(&bus, EntryActionPayload::new(EntryActionKind::Clear));
        assert_eq!(events(&log, EventType::EntryFormCleared).len(), 1);
        assert!(mediator.state().is_empty());
    }

    #[test]
    fn test_register_entry() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let commands = FakeCommands::new(false);
        let mediator = Mediator::builder(bus.clone())
            .commands(commands.clone())
            .build()
            .unwrap();

        act(&bus, EntryActionPayload::new(EntryActionKind::Register));
        let errors = events(&log, EventType::ValidationError);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            validation(&errors[0]).validation_type.as_deref(),
            Some("entry_registration")
        );

        select(&bus, laptop());
        act(&bus, add(4));
        act(&bus, EntryActionPayload::new(EntryActionKind::Register));

        let registered = events(&log, EventType::EntryRegistered);
        assert_eq!(registered.len(), 1);
        match &registered[0].payload {
            EventPayload::Registration(p) => {
                assert_eq!(p.entry_id, "E-100");
                assert_eq!(p.ticket_number, "T-0001");
                assert_eq!(p.line_count, 1);
            }
            other => panic!("unexpected payload {:?}", other),
        }

        let received = commands.received.lock().unwrap();
        assert_eq!(received[0].lines[0].quantity, 4);
        assert_eq!(received[0].movement_type, MovementType::Entrada);
        assert!(mediator.state().is_empty());
    }

    #[test]
    fn test_failed_registration_keeps_lines() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::builder(bus.clone())
            .commands(FakeCommands::new(true))
            .build()
            .unwrap();

        select(&bus, laptop());
        act(&bus, add(1));
        act(&bus, EntryActionPayload::new(EntryActionKind::Register));

        let errors = events(&log, EventType::ValidationError);
        assert_eq!(errors.len(), 1);
        assert!(validation(&errors[0]).error_messages[0].contains("database locked"));
        assert!(events(&log, EventType::EntryRegistered).is_empty());
        assert_eq!(mediator.entry_lines().len(), 1);
    }

    #[test]
    fn test_register_without_commands_is_ignored() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, laptop());
        act(&bus, add(1));
        act(&bus, EntryActionPayload::new(EntryActionKind::Register));

        assert!(events(&log, EventType::EntryRegistered).is_empty());
        assert!(events(&log, EventType::ValidationError).is_empty());
        assert_eq!(mediator.entry_lines().len(), 1);
    }

    // -------------------------------------------------------------------------
    // Validation results
    // -------------------------------------------------------------------------

    #[test]
    fn test_validation_failure_without_type_is_tolerated() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let _mediator = Mediator::new(bus.clone()).unwrap();

        bus.publish(
            EventType::ValidationResult,
            EventPayload::Validation(ValidationPayload {
                validation_type: None,
                is_valid: false,
                error_messages: vec!["quantity missing".into()],
                ..Default::default()
            }),
            "EntryForm",
        )
        .unwrap();
        bus.publish(
            EventType::ValidationResult,
            EventPayload::Validation(ValidationPayload::failure(
                "entry_form",
                vec!["supplier missing".into()],
            )),
            "EntryForm",
        )
        .unwrap();

        assert_eq!(bus.stats().faults, 0);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_validation_failure_requires_type() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        let untyped = ValidationPayload {
            validation_type: None,
            is_valid: false,
            error_messages: vec!["quantity missing".into()],
            ..Default::default()
        };
        let result = mediator.inner.handle_validation_failure(&untyped, "EntryForm");
        assert!(matches!(
            result,
            Err(MediatorError::MissingDiscriminator { ref source_name }) if source_name == "EntryForm"
        ));

        let typed = ValidationPayload::failure("entry_form", vec!["supplier missing".into()]);
        assert!(mediator.inner.handle_validation_failure(&typed, "EntryForm").is_ok());
        assert!(log.lock().unwrap().is_empty());
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn test_cleanup_unregisters_and_resets() {
        let bus = EventBus::new();
        let mediator = Mediator::new(bus.clone()).unwrap();
        assert!(mediator.is_active());
        assert_eq!(bus.listener_count(EventType::ProductSelected), 1);

        select(&bus, laptop());
        assert!(mediator.current_selected().is_some());

        mediator.cleanup();
        mediator.cleanup();
        assert!(!mediator.is_active());
        assert!(mediator.state().is_empty());
        for event_type in [
            EventType::ProductSelected,
            EventType::ProductSearchRequest,
            EventType::EntryAction,
            EventType::ValidationResult,
        ] {
            assert_eq!(bus.listener_count(event_type), 0);
        }

        select(&bus, laptop());
        assert!(mediator.current_selected().is_none());
    }

    #[test]
    fn test_drop_unregisters() {
        let bus = EventBus::new();
        {
            let _mediator = Mediator::new(bus.clone()).unwrap();
            assert_eq!(bus.registered_events().len(), 4);
        }
        assert!(bus.registered_events().is_empty());
    }

    #[test]
    fn test_custom_settings() {
        let bus = EventBus::new();
        let log = capture(&bus);
        let settings = MediatorSettings {
            source_name: "EntryMediator".into(),
            search_owner: "Catalog".into(),
            default_movement_type: MovementType::Ajuste,
        };
        let _mediator = Mediator::builder(bus.clone())
            .settings(settings)
            .build()
            .unwrap();

        select(&bus, laptop());
        search(&bus, "lap", "Catalog");

        let derived = events(&log, EventType::EntryAction);
        assert_eq!(derived[0].source, "EntryMediator");
        match &derived[0].payload {
            EventPayload::EntryAction(p) => assert_eq!(p.movement_type, MovementType::Ajuste),
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(events(&log, EventType::ProductSearchRequest).len(), 1);

        let blank = MediatorSettings {
            source_name: " ".into(),
            ..MediatorSettings::default()
        };
        assert!(Mediator::builder(EventBus::new()).settings(blank).build().is_err());
    }

    #[test]
    fn test_selection_through_host_loop() {
        let bus = EventBus::new();
        let (mut host, handle) = HostLoop::new(32);
        bus.bind_host_loop(handle);
        let log = capture(&bus);
        let mediator = Mediator::new(bus.clone()).unwrap();

        select(&bus, laptop());
        assert!(mediator.current_selected().is_none());
        assert!(log.lock().unwrap().is_empty());

        while host.run_pending() > 0 {}

        assert_eq!(mediator.current_selected(), Some(laptop()));
        let derived = events(&log, EventType::EntryAction);
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].source, "Mediator");
    }
}
