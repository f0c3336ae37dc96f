//! # Named Finite State Machine
//!
//! A small, embeddable finite state machine driven by a declarative map of
//! named states. Each state carries optional enter/exit actions and a table
//! of named event handlers; the machine tracks the current state, performs
//! transitions with lifecycle callbacks and dispatches events to the active
//! state.
//!
//! ## Features
//!
//! - 🗺️ **Declarative States**: build maps in code or load them from JSON
//! - 🔁 **Re-entrant Actions**: handlers receive the machine and may transition or dispatch
//! - 📣 **Notifications**: `debug`, `transition`, `error` and application channels
//! - 🛡️ **Validation**: malformed maps are rejected before a machine exists
//! - 📊 **PlantUML Export**: state diagrams from the map and observed transitions
//!
//! ## Quick Start
//!
//! ```rust
//! use named_fsm::prelude::*;
//!
//! #[derive(Default)]
//! struct Link { retries: u32 }
//!
//! let states = Definitions::new()
//!     .with("IDLE", StateDefinition::new("Idle")
//!         .on_event("connect", |fsm: &mut StateMachine<Link, u32>, _args: &[u32]| {
//!             fsm.transition_to_key("CONNECTING");
//!         }))
//!     .with("CONNECTING", StateDefinition::new("Connecting")
//!         .on_enter(|fsm: &mut StateMachine<Link, u32>| fsm.context_mut().retries += 1));
//!
//! let mut fsm = StateMachine::new(Link::default(), states)?;
//! fsm.subscribe("transition", |n: &Notification<'_, Link, u32>| {
//!     if let Notification::Transition { to, .. } = n {
//!         println!("now {}", to.name());
//!     }
//! });
//!
//! fsm.transition_to_key("IDLE");
//! fsm.dispatch_event("connect", &[]);
//! assert!(fsm.is_in("CONNECTING"));
//! assert_eq!(fsm.context().retries, 1);
//! # Ok::<(), named_fsm::ValidationError>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

mod builder;
mod error;
mod fsm;
mod state;

pub mod document;
pub mod notify;

#[cfg(feature = "plantuml")]
mod plantuml;

pub use builder::StateMachineBuilder;
pub use error::{DispatchError, Error, Result, ValidationError};
pub use fsm::StateMachine;
pub use notify::{Channel, Emitter, Listener, Notification, Notifier, UnobservedErrors};
pub use state::{Action, Definitions, EventHandler, StateDefinition, StateRef};
pub use document::ActionRegistry;

pub mod prelude {
    //! Prelude module for convenient imports
    pub use crate::{
        Channel, Definitions, DispatchError, Notification, StateDefinition, StateMachine,
        StateMachineBuilder, UnobservedErrors, ValidationError,
    };
}
