//! Declarative state maps loaded from JSON.
//!
//! A document names its actions instead of embedding them:
//!
//! ```json
//! {
//!   "INITIALIZING": { "name": "Initializing", "enter": "log_enter",
//!                     "events": { "ready": "go_connecting" } },
//!   "CONNECTING":   { "name": "Connecting" }
//! }
//! ```
//!
//! Names resolve through an [`ActionRegistry`]. A name that is missing from
//! the registry, or a value that is not a name at all, is treated as a
//! non-callable entry and rejected.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::state::{Action, Definitions, EventHandler, StateDefinition};
use crate::StateMachine;

/// Named actions and event handlers a document may refer to
pub struct ActionRegistry<CTX, A> {
    actions: HashMap<String, Action<CTX, A>>,
    handlers: HashMap<String, EventHandler<CTX, A>>,
}

impl<CTX, A> ActionRegistry<CTX, A> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            handlers: HashMap::new(),
        }
    }

    /// Register an `enter`/`exit` action under `name`
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut StateMachine<CTX, A>) + 'static,
    {
        self.actions.insert(name.into(), Rc::new(action));
        self
    }

    /// Register an event handler under `name`
    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut StateMachine<CTX, A>, &[A]) + 'static,
    {
        self.handlers.insert(name.into(), Rc::new(handler));
        self
    }

    fn resolve_action(&self, value: &Value) -> Option<Action<CTX, A>> {
        value.as_str().and_then(|name| self.actions.get(name)).cloned()
    }

    fn resolve_handler(&self, value: &Value) -> Option<EventHandler<CTX, A>> {
        value.as_str().and_then(|name| self.handlers.get(name)).cloned()
    }
}

impl<CTX, A> Default for ActionRegistry<CTX, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<CTX, A> Definitions<CTX, A> {
    /// Build and validate a definition map from a JSON document
    pub fn from_json(document: &Value, registry: &ActionRegistry<CTX, A>) -> Result<Self, ValidationError> {
        let states = document.as_object().ok_or(ValidationError::NotAMapping)?;

        let mut definitions = Definitions::new();
        for (key, state) in states {
            let state = parse_state(key, state, registry)?;
            definitions.insert(key.clone(), state);
        }
        definitions.validate()?;
        Ok(definitions)
    }

    /// Parse `text` as JSON and build a definition map from it
    pub fn from_json_str(text: &str, registry: &ActionRegistry<CTX, A>) -> crate::Result<Self> {
        let document: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&document, registry)?)
    }
}

fn parse_state<CTX, A>(
    key: &str,
    state: &Value,
    registry: &ActionRegistry<CTX, A>,
) -> Result<StateDefinition<CTX, A>, ValidationError> {
    let fields = state.as_object().ok_or_else(|| ValidationError::StateNotAMapping {
        key: key.to_string(),
    })?;

    let name = fields
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ValidationError::MissingName { key: key.to_string() })?;
    let mut definition = StateDefinition::new(name);

    if let Some(enter) = present(fields, "enter") {
        let action = registry
            .resolve_action(enter)
            .ok_or_else(|| ValidationError::EnterNotCallable { key: key.to_string() })?;
        definition.enter = Some(action);
    }

    if let Some(exit) = present(fields, "exit") {
        let action = registry
            .resolve_action(exit)
            .ok_or_else(|| ValidationError::ExitNotCallable { key: key.to_string() })?;
        definition.exit = Some(action);
    }

    if let Some(events) = present(fields, "events") {
        let events = events
            .as_object()
            .ok_or_else(|| ValidationError::EventsNotAMapping { key: key.to_string() })?;
        for (event, handler) in events {
            let handler = registry
                .resolve_handler(handler)
                .ok_or_else(|| ValidationError::HandlerNotCallable {
                    key: key.to_string(),
                    event: event.clone(),
                })?;
            definition.events.insert(event.clone(), handler);
        }
    }

    Ok(definition)
}

// Optional fields set to null count as absent
fn present<'a>(fields: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    fields.get(field).filter(|value| !value.is_null())
}
