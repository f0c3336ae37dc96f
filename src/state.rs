//! State definitions and the validated map a machine is built from

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

use crate::error::ValidationError;
use crate::fsm::StateMachine;

/// An `enter` or `exit` action. Runs with the owning machine as its context.
pub type Action<CTX, A> = Rc<dyn Fn(&mut StateMachine<CTX, A>)>;

/// A named event handler. Receives the owning machine and the dispatched
/// arguments exactly as the caller passed them.
pub type EventHandler<CTX, A> = Rc<dyn Fn(&mut StateMachine<CTX, A>, &[A])>;

/// Shared handle to one entry of a [`Definitions`] map.
///
/// State identity is pointer identity: two handles denote the same state
/// only if they point at the same entry.
pub type StateRef<CTX, A> = Rc<StateDefinition<CTX, A>>;

/// One named state: its label, optional lifecycle actions and event table.
pub struct StateDefinition<CTX, A> {
    pub(crate) key: String,
    pub(crate) name: String,
    pub(crate) enter: Option<Action<CTX, A>>,
    pub(crate) exit: Option<Action<CTX, A>>,
    pub(crate) events: HashMap<String, EventHandler<CTX, A>>,
}

impl<CTX, A> StateDefinition<CTX, A> {
    /// Create a state with the given human readable name and no actions
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: String::new(),
            name: name.into(),
            enter: None,
            exit: None,
            events: HashMap::new(),
        }
    }

    /// Set the action run when this state becomes active
    pub fn on_enter<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut StateMachine<CTX, A>) + 'static,
    {
        self.enter = Some(Rc::new(action));
        self
    }

    /// Set the action run when this state stops being active
    pub fn on_exit<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut StateMachine<CTX, A>) + 'static,
    {
        self.exit = Some(Rc::new(action));
        self
    }

    /// Register the handler for a named event, replacing any previous one
    pub fn on_event<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut StateMachine<CTX, A>, &[A]) + 'static,
    {
        self.events.insert(event.into(), Rc::new(handler));
        self
    }

    /// Key this state is registered under. Empty until inserted into a map.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human readable name used in notifications
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The enter action, if any
    pub fn enter(&self) -> Option<&Action<CTX, A>> {
        self.enter.as_ref()
    }

    /// The exit action, if any
    pub fn exit(&self) -> Option<&Action<CTX, A>> {
        self.exit.as_ref()
    }

    /// Handler registered for `event`, if any
    pub fn handler(&self, event: &str) -> Option<&EventHandler<CTX, A>> {
        self.events.get(event)
    }

    /// Names of every event this state handles, in no particular order
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }
}

impl<CTX, A> fmt::Debug for StateDefinition<CTX, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<&str> = self.events().collect();
        events.sort_unstable();
        f.debug_struct("StateDefinition")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("enter", &self.enter.is_some())
            .field("exit", &self.exit.is_some())
            .field("events", &events)
            .finish()
    }
}

/// Mapping from state key to state definition.
///
/// Entries are shared handles; once the map is handed to a machine it is
/// never mutated again.
pub struct Definitions<CTX, A> {
    states: HashMap<String, StateRef<CTX, A>>,
}

impl<CTX, A> Definitions<CTX, A> {
    /// Create an empty map
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Insert a state under `key` and return the shared handle to it
    pub fn insert(&mut self, key: impl Into<String>, mut state: StateDefinition<CTX, A>) -> StateRef<CTX, A> {
        let key = key.into();
        state.key = key.clone();
        let state = Rc::new(state);
        self.states.insert(key, Rc::clone(&state));
        state
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, state: StateDefinition<CTX, A>) -> Self {
        self.insert(key, state);
        self
    }

    /// Look a state up by key
    pub fn get(&self, key: &str) -> Option<&StateRef<CTX, A>> {
        self.states.get(key)
    }

    /// Whether `state` is one of this map's own entries
    pub fn contains(&self, state: &StateRef<CTX, A>) -> bool {
        self.states
            .get(state.key())
            .is_some_and(|own| Rc::ptr_eq(own, state))
    }

    /// Iterate over `(key, state)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateRef<CTX, A>)> {
        self.states.iter().map(|(key, state)| (key.as_str(), state))
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.states.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Number of states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the map has no states
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Check every entry of the map.
    ///
    /// Actions and handlers are well formed by construction, so the
    /// remaining requirement is a non-empty name on every state.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (key, state) in &self.states {
            if state.name.is_empty() {
                return Err(ValidationError::MissingName { key: key.clone() });
            }
        }
        Ok(())
    }

    pub(crate) fn merge(&mut self, other: Definitions<CTX, A>) {
        self.states.extend(other.states);
    }
}

impl<CTX, A> Default for Definitions<CTX, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<CTX, A> Index<&str> for Definitions<CTX, A> {
    type Output = StateRef<CTX, A>;

    fn index(&self, key: &str) -> &Self::Output {
        &self.states[key]
    }
}

impl<CTX, A, K> FromIterator<(K, StateDefinition<CTX, A>)> for Definitions<CTX, A>
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, StateDefinition<CTX, A>)>>(iter: I) -> Self {
        let mut definitions = Self::new();
        for (key, state) in iter {
            definitions.insert(key, state);
        }
        definitions
    }
}

impl<CTX, A> fmt::Debug for Definitions<CTX, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.states.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        f.debug_map().entries(entries).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Defs = Definitions<(), ()>;

    #[test]
    fn test_insert_assigns_key() {
        let mut defs = Defs::new();
        let state = defs.insert("CONNECTING", StateDefinition::new("Connecting"));

        assert_eq!(state.key(), "CONNECTING");
        assert_eq!(state.name(), "Connecting");
        assert!(Rc::ptr_eq(&state, &defs["CONNECTING"]));
    }

    #[test]
    fn test_contains_uses_identity() {
        let defs = Defs::new().with("A", StateDefinition::new("A"));
        let lookalike = Defs::new().with("A", StateDefinition::new("A"));

        assert!(defs.contains(&defs["A"]));
        assert!(!defs.contains(&lookalike["A"]));
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let defs = Defs::new()
            .with("INITIALIZING", StateDefinition::new("Initializing"))
            .with("CONNECTING", StateDefinition::new(""));

        assert_eq!(
            defs.validate(),
            Err(ValidationError::MissingName {
                key: "CONNECTING".to_string()
            })
        );
    }

    #[test]
    fn test_validate_accepts_well_formed_map() {
        let defs: Defs = [
            ("INITIALIZING", StateDefinition::<(), ()>::new("Initializing").on_enter(|_| {})),
            ("CONNECTING", StateDefinition::<(), ()>::new("Connecting").on_event("ready", |_, _| {})),
        ]
        .into_iter()
        .collect();

        assert!(defs.validate().is_ok());
        assert_eq!(defs.keys(), vec!["CONNECTING", "INITIALIZING"]);
        assert!(Defs::new().validate().is_ok());
    }

    #[test]
    fn test_definition_accessors() {
        let state = StateDefinition::<(), ()>::new("Open")
            .on_exit(|_| {})
            .on_event("close", |_, _| {})
            .on_event("send", |_, _| {});

        assert!(state.enter().is_none());
        assert!(state.exit().is_some());
        assert!(state.handler("close").is_some());
        assert!(state.handler("open").is_none());

        let mut events: Vec<&str> = state.events().collect();
        events.sort_unstable();
        assert_eq!(events, vec!["close", "send"]);
    }
}
