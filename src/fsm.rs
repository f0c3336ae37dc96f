//! A synchronous finite state machine driven by a declarative map of named states.
//!
//! # Type Parameters
//! - `CTX`: Application context owned by the machine and reachable from every action.
//! - `A`: Argument type carried by dispatched events and custom notifications.
//!
//! # Features
//! - Lifecycle actions: each state may define `enter` and `exit` actions.
//! - Named events: each state maps event names to handlers via [`StateDefinition::on_event`](crate::StateDefinition::on_event).
//! - Re-entrancy: actions and handlers receive the machine itself and may call
//!   [`StateMachine::transition_to`] or [`StateMachine::dispatch_event`] from inside.
//! - Notifications on the `debug`, `transition`, `error` and application channels.
//! - Optional PlantUML export of the state map and observed transitions
//!   (enabled with the `plantuml` feature).
//!
//! # Usage
//! 1. Describe each state with a [`StateDefinition`](crate::StateDefinition).
//! 2. Collect them into [`Definitions`] keyed by state key.
//! 3. Build the machine with [`StateMachine::new`] or the [`StateMachineBuilder`](crate::StateMachineBuilder).
//! 4. Enter the first state with [`StateMachine::transition_to`].
//! 5. Drive it with [`StateMachine::dispatch_event`].
//!
//! # Errors
//! Malformed definitions are rejected at construction with [`ValidationError`].
//! Runtime problems (unhandled events, foreign states) are published on the
//! `error` channel as [`DispatchError`] and leave the machine usable.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{DispatchError, ValidationError};
use crate::notify::{Channel, Emitter, Notification, Notifier};
use crate::state::{Definitions, StateRef};

/// A finite state machine over a validated map of named states.
pub struct StateMachine<CTX, A> {
    definitions: Definitions<CTX, A>,
    current_state: Option<StateRef<CTX, A>>,
    context: CTX,
    notifier: Box<dyn Notifier<CTX, A>>,

    // Distinct (from, to) key pairs, in the order first observed
    #[cfg(feature = "plantuml")]
    transition_log: Vec<(Option<String>, String)>,
}

impl<CTX: 'static, A: 'static> StateMachine<CTX, A> {
    /// Check a definition map without building a machine
    pub fn validate(definitions: &Definitions<CTX, A>) -> Result<(), ValidationError> {
        definitions.validate()
    }

    /// Create a machine with the default [`Emitter`] notifier.
    ///
    /// The machine starts with no active state.
    pub fn new(context: CTX, definitions: Definitions<CTX, A>) -> Result<Self, ValidationError> {
        Self::with_notifier(context, definitions, Emitter::new())
    }

    /// Create a machine that reports through a custom [`Notifier`]
    pub fn with_notifier<N>(
        context: CTX,
        definitions: Definitions<CTX, A>,
        notifier: N,
    ) -> Result<Self, ValidationError>
    where
        N: Notifier<CTX, A> + 'static,
    {
        Self::from_parts(context, definitions, Box::new(notifier))
    }

    pub(crate) fn from_parts(
        context: CTX,
        definitions: Definitions<CTX, A>,
        notifier: Box<dyn Notifier<CTX, A>>,
    ) -> Result<Self, ValidationError> {
        Self::validate(&definitions)?;
        debug!(states = definitions.len(), "state machine created");

        Ok(Self {
            definitions,
            current_state: None,
            context,
            notifier,

            #[cfg(feature = "plantuml")]
            transition_log: Vec::new(),
        })
    }

    /// Transition to `target`, one of this machine's own definitions.
    ///
    /// Runs the current state's `exit`, publishes a debug and a transition
    /// notification, makes `target` current, then runs its `enter`. Returns
    /// `false` without side effects beyond a debug notification when `target`
    /// is already current, and `false` with an error notification when
    /// `target` belongs to another map.
    ///
    /// With the default [`Emitter`] and no `error` subscriber, that error
    /// notification panics unless [`UnobservedErrors::Log`](crate::UnobservedErrors::Log)
    /// is configured.
    ///
    /// An `exit` action that transitions must guard against calling itself
    /// again. The state it moves to is entered but never exited: the outer
    /// transition then continues from it to `target`.
    pub fn transition_to(&mut self, target: &StateRef<CTX, A>) -> bool {
        if !self.definitions.contains(target) {
            debug!(state = target.name(), "refusing transition to a foreign state");
            self.report(DispatchError::UnknownState {
                state: target.name().to_string(),
            });
            return false;
        }

        // Nothing to exit from on the very first transition
        if let Some(current) = self.current_state.clone() {
            if Rc::ptr_eq(&current, target) {
                let message = format!("State is already {}", target.name());
                debug!(state = target.name(), "{message}");
                self.notifier.publish(&Notification::Debug(&message));
                return false;
            }

            if let Some(exit) = current.exit() {
                exit(self);
            }
        }

        // Read after exit so `from` names the state an exit action moved to
        let from = self.current_state.clone();
        let from_name = from.as_ref().map_or("none", |s| s.name());
        let message = format!("State change: {} -> {}", from_name, target.name());
        debug!(from = from_name, to = target.name(), "state change");

        self.notifier.publish(&Notification::Debug(&message));
        self.notifier.publish(&Notification::Transition {
            from: from.as_ref(),
            to: target,
        });
        self.log_transition(from.as_ref(), target);

        self.current_state = Some(Rc::clone(target));

        if let Some(enter) = target.enter() {
            enter(self);
        }
        true
    }

    /// Transition to the state registered under `key`.
    ///
    /// An unknown key is reported on the `error` channel and returns `false`.
    /// Like any error notification, it panics when nobody observes it and
    /// the default [`Emitter`] policy is in effect.
    pub fn transition_to_key(&mut self, key: &str) -> bool {
        match self.definitions.get(key).cloned() {
            Some(target) => self.transition_to(&target),
            None => {
                debug!(key, "refusing transition to an unknown key");
                self.report(DispatchError::UnknownState {
                    state: key.to_string(),
                });
                false
            }
        }
    }

    /// Invoke the current state's handler for `event` with `args` untouched.
    ///
    /// When the current state has no such handler, or no state is active
    /// yet, a [`DispatchError`] is published on the `error` channel instead.
    pub fn dispatch_event(&mut self, event: &str, args: &[A]) {
        let Some(current) = self.current_state.clone() else {
            self.report(DispatchError::NoActiveState {
                event: event.to_string(),
            });
            return;
        };

        match current.handler(event) {
            Some(handler) => {
                trace!(event, state = current.name(), args = args.len(), "dispatching event");
                handler(self, args);
            }
            None => self.report(DispatchError::NoEvent {
                event: event.to_string(),
                state: current.name().to_string(),
            }),
        }
    }

    /// Publish `args` on the channel named `channel`.
    ///
    /// Built-in names deliver to that channel's subscribers as
    /// [`Notification::Custom`]. Emitting on `"error"` with nobody listening
    /// is as loud as an unobserved [`DispatchError`].
    pub fn emit(&mut self, channel: &str, args: &[A]) {
        self.notifier.publish(&Notification::Custom { channel, args });
    }

    /// Register a listener for `channel`.
    ///
    /// `"debug"`, `"transition"` and `"error"` name the built-in channels;
    /// any other name is an application channel fed by [`emit`](Self::emit).
    pub fn subscribe<F>(&mut self, channel: impl Into<Channel>, listener: F)
    where
        F: FnMut(&Notification<'_, CTX, A>) + 'static,
    {
        self.notifier.subscribe(channel.into(), Box::new(listener));
    }

    /// Number of listeners registered for `channel`
    pub fn listener_count(&self, channel: impl Into<Channel>) -> usize {
        self.notifier.listener_count(&channel.into())
    }

    fn report(&mut self, err: DispatchError) {
        self.notifier.publish(&Notification::Error(&err));
    }

    #[cfg(feature = "plantuml")]
    fn log_transition(&mut self, from: Option<&StateRef<CTX, A>>, to: &StateRef<CTX, A>) {
        let entry = (from.map(|s| s.key().to_string()), to.key().to_string());
        if !self.transition_log.contains(&entry) {
            self.transition_log.push(entry);
        }
    }

    #[cfg(not(feature = "plantuml"))]
    fn log_transition(&mut self, _from: Option<&StateRef<CTX, A>>, _to: &StateRef<CTX, A>) {
        // No-op when plantuml feature is disabled
    }
}

impl<CTX, A> StateMachine<CTX, A> {
    /// The active state, or `None` before the first transition
    pub fn current_state(&self) -> Option<&StateRef<CTX, A>> {
        self.current_state.as_ref()
    }

    /// Whether the state registered under `key` is the active one
    pub fn is_in(&self, key: &str) -> bool {
        match (&self.current_state, self.definitions.get(key)) {
            (Some(current), Some(state)) => Rc::ptr_eq(current, state),
            _ => false,
        }
    }

    /// The bound definition map
    pub fn definitions(&self) -> &Definitions<CTX, A> {
        &self.definitions
    }

    /// The state registered under `key`
    pub fn state(&self, key: &str) -> Option<&StateRef<CTX, A>> {
        self.definitions.get(key)
    }

    /// Get a reference to the context
    pub fn context(&self) -> &CTX {
        &self.context
    }

    /// Get a mutable reference to the context
    pub fn context_mut(&mut self) -> &mut CTX {
        &mut self.context
    }

    /// Consume the machine and hand back its context
    pub fn into_context(self) -> CTX {
        self.context
    }

    /// Export the state map and every distinct observed transition as PlantUML
    #[cfg(feature = "plantuml")]
    pub fn export_plantuml(&self) -> String {
        crate::plantuml::generate_plantuml(
            &self.definitions,
            &self.transition_log,
            self.current_state.as_ref(),
        )
    }

    /// Stub for export_plantuml when feature is disabled
    #[cfg(not(feature = "plantuml"))]
    pub fn export_plantuml(&self) -> String {
        String::from("PlantUML export not available (requires 'plantuml' feature)")
    }
}

impl<CTX, A> std::fmt::Debug for StateMachine<CTX, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("states", &self.definitions.keys())
            .field("current_state", &self.current_state.as_ref().map(|s| s.key()))
            .finish_non_exhaustive()
    }
}
