//! Error types for the state machine

use thiserror::Error;

/// Result type alias for operations that can fail on input text as well as validation
pub type Result<T> = std::result::Result<T, Error>;

/// A malformed state definition map.
///
/// Returned from validation and construction; a machine is never built from
/// a map that fails any of these checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The root of the definition map is not a mapping
    #[error("State definitions must be an object")]
    NotAMapping,

    /// A state entry is not a mapping
    #[error("State `{key}` must be an object")]
    StateNotAMapping {
        /// Map key of the offending entry
        key: String,
    },

    /// A state entry has no usable name
    #[error("State `{key}` must have a non-empty name")]
    MissingName {
        /// Map key of the offending entry
        key: String,
    },

    /// `enter` is present but does not resolve to an action
    #[error("Enter action of state `{key}` must be a function if provided")]
    EnterNotCallable {
        /// Map key of the offending entry
        key: String,
    },

    /// `exit` is present but does not resolve to an action
    #[error("Exit action of state `{key}` must be a function if provided")]
    ExitNotCallable {
        /// Map key of the offending entry
        key: String,
    },

    /// `events` is present but is not a mapping
    #[error("Events of state `{key}` must be an object if provided")]
    EventsNotAMapping {
        /// Map key of the offending entry
        key: String,
    },

    /// An entry inside `events` does not resolve to a handler
    #[error("Handler for event `{event}` in state `{key}` must be a function")]
    HandlerNotCallable {
        /// Map key of the offending entry
        key: String,
        /// Event name whose handler is malformed
        event: String,
    },
}

/// A runtime condition reported on the `error` notification channel.
///
/// These never abort the machine; it stays usable after one is published.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The current state has no handler for the dispatched event
    #[error("No event '{event}' in state '{state}'")]
    NoEvent {
        /// Dispatched event name
        event: String,
        /// Name of the state that was active
        state: String,
    },

    /// An event was dispatched before the first transition
    #[error("No event '{event}' can be handled: the machine has no active state")]
    NoActiveState {
        /// Dispatched event name
        event: String,
    },

    /// A transition target is not one of this machine's definitions
    #[error("State '{state}' does not belong to this machine")]
    UnknownState {
        /// Name or key of the rejected target
        state: String,
    },
}

/// Errors from loading a state map document
#[derive(Error, Debug)]
pub enum Error {
    /// The definition map failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A state map document could not be parsed
    #[error("Invalid state map document: {0}")]
    Document(#[from] serde_json::Error),
}
