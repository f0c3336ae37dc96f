//! Builder pattern implementation for state machines

use crate::error::ValidationError;
use crate::notify::{Emitter, Notifier, UnobservedErrors};
use crate::state::{Definitions, StateDefinition};
use crate::StateMachine;

/// Builder for constructing state machines
pub struct StateMachineBuilder<CTX, A> {
    context: CTX,
    definitions: Definitions<CTX, A>,
    unobserved_errors: UnobservedErrors,
    notifier: Option<Box<dyn Notifier<CTX, A>>>,
}

impl<CTX: 'static, A: 'static> StateMachineBuilder<CTX, A> {
    /// Create a new builder with the given context
    pub fn new(context: CTX) -> Self {
        Self {
            context,
            definitions: Definitions::new(),
            unobserved_errors: UnobservedErrors::default(),
            notifier: None,
        }
    }

    /// Add a state to the state machine
    pub fn state(mut self, key: impl Into<String>, state: StateDefinition<CTX, A>) -> Self {
        self.definitions.insert(key, state);
        self
    }

    /// Add every state of an existing map, replacing states with the same key
    pub fn definitions(mut self, definitions: Definitions<CTX, A>) -> Self {
        self.definitions.merge(definitions);
        self
    }

    /// Choose what the default notifier does with unobserved errors.
    ///
    /// Ignored when a custom notifier is supplied.
    pub fn unobserved_errors(mut self, policy: UnobservedErrors) -> Self {
        self.unobserved_errors = policy;
        self
    }

    /// Report through a custom notifier instead of the default [`Emitter`]
    pub fn notifier<N>(mut self, notifier: N) -> Self
    where
        N: Notifier<CTX, A> + 'static,
    {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Validate the collected states and build the state machine
    pub fn build(self) -> Result<StateMachine<CTX, A>, ValidationError> {
        let unobserved_errors = self.unobserved_errors;
        let notifier = self
            .notifier
            .unwrap_or_else(|| Box::new(Emitter::with_policy(unobserved_errors)));
        StateMachine::from_parts(self.context, self.definitions, notifier)
    }
}
