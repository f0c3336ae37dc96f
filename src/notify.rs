//! Notification channel used to report debug, transition and error
//! occurrences to observers outside the machine.

use std::fmt;

use tracing::error;

use crate::error::DispatchError;
use crate::state::StateRef;

/// A named channel observers can subscribe to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Human readable progress messages
    Debug,
    /// State changes, carrying the old and new state
    Transition,
    /// Runtime errors such as unhandled events
    Error,
    /// Any application defined channel
    Custom(String),
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        match name {
            "debug" => Channel::Debug,
            "transition" => Channel::Transition,
            "error" => Channel::Error,
            other => Channel::Custom(other.to_string()),
        }
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Channel::from(name.as_str())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Debug => f.write_str("debug"),
            Channel::Transition => f.write_str("transition"),
            Channel::Error => f.write_str("error"),
            Channel::Custom(name) => f.write_str(name),
        }
    }
}

/// A single published message, borrowed for the duration of delivery
pub enum Notification<'a, CTX, A> {
    /// A formatted debug message
    Debug(&'a str),
    /// A completed state change. `from` is `None` on the first transition.
    Transition {
        /// State that was active before
        from: Option<&'a StateRef<CTX, A>>,
        /// State that is becoming active
        to: &'a StateRef<CTX, A>,
    },
    /// A reported runtime error
    Error(&'a DispatchError),
    /// A message on an application defined channel
    Custom {
        /// Channel name
        channel: &'a str,
        /// Arguments as passed to [`StateMachine::emit`](crate::StateMachine::emit)
        args: &'a [A],
    },
}

impl<CTX, A> Notification<'_, CTX, A> {
    /// The channel this notification is delivered on.
    ///
    /// Application messages emitted under a built-in name (`"error"` for
    /// instance) travel on that built-in channel.
    pub fn channel(&self) -> Channel {
        match self {
            Notification::Debug(_) => Channel::Debug,
            Notification::Transition { .. } => Channel::Transition,
            Notification::Error(_) => Channel::Error,
            Notification::Custom { channel, .. } => Channel::from(*channel),
        }
    }

    /// Whether this notification is delivered to subscribers of `channel`
    pub fn is_on(&self, channel: &Channel) -> bool {
        self.channel() == *channel
    }
}

impl<CTX, A: fmt::Debug> fmt::Debug for Notification<'_, CTX, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Debug(message) => f.debug_tuple("Debug").field(message).finish(),
            Notification::Transition { from, to } => f
                .debug_struct("Transition")
                .field("from", &from.map(|s| s.name()))
                .field("to", &to.name())
                .finish(),
            Notification::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Notification::Custom { channel, args } => f
                .debug_struct("Custom")
                .field("channel", channel)
                .field("args", args)
                .finish(),
        }
    }
}

/// A subscriber callback
pub type Listener<CTX, A> = Box<dyn FnMut(&Notification<'_, CTX, A>)>;

/// Publish/subscribe mechanism the machine reports through.
///
/// [`Emitter`] is the default; supply another implementation through
/// [`StateMachineBuilder::notifier`](crate::StateMachineBuilder::notifier).
pub trait Notifier<CTX, A> {
    /// Register `listener` for every notification on `channel`
    fn subscribe(&mut self, channel: Channel, listener: Listener<CTX, A>);

    /// Deliver `notification` to the listeners of its channel
    fn publish(&mut self, notification: &Notification<'_, CTX, A>);

    /// Number of listeners currently registered for `channel`
    fn listener_count(&self, channel: &Channel) -> usize;
}

/// What [`Emitter`] does with an error notification nobody listens to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnobservedErrors {
    /// Panic with the error message
    #[default]
    Panic,
    /// Log the error through `tracing` and carry on
    Log,
}

/// Default [`Notifier`]: listeners run synchronously, in subscription order.
pub struct Emitter<CTX, A> {
    listeners: Vec<(Channel, Listener<CTX, A>)>,
    unobserved_errors: UnobservedErrors,
}

impl<CTX, A> Emitter<CTX, A> {
    /// Create an emitter with no listeners that panics on unobserved errors
    pub fn new() -> Self {
        Self::with_policy(UnobservedErrors::default())
    }

    /// Create an emitter with no listeners and the given unobserved error policy
    pub fn with_policy(unobserved_errors: UnobservedErrors) -> Self {
        Self {
            listeners: Vec::new(),
            unobserved_errors,
        }
    }

    /// The unobserved error policy in effect
    pub fn unobserved_errors(&self) -> UnobservedErrors {
        self.unobserved_errors
    }
}

impl<CTX, A> Default for Emitter<CTX, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<CTX, A> fmt::Debug for Emitter<CTX, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels: Vec<&Channel> = self.listeners.iter().map(|(channel, _)| channel).collect();
        f.debug_struct("Emitter")
            .field("listeners", &channels)
            .field("unobserved_errors", &self.unobserved_errors)
            .finish()
    }
}

impl<CTX, A> Notifier<CTX, A> for Emitter<CTX, A> {
    fn subscribe(&mut self, channel: Channel, listener: Listener<CTX, A>) {
        self.listeners.push((channel, listener));
    }

    fn publish(&mut self, notification: &Notification<'_, CTX, A>) {
        let mut delivered = 0;
        for (channel, listener) in &mut self.listeners {
            if notification.is_on(channel) {
                listener(notification);
                delivered += 1;
            }
        }

        if delivered > 0 || notification.channel() != Channel::Error {
            return;
        }
        let message = match notification {
            Notification::Error(err) => err.to_string(),
            Notification::Custom { args, .. } => {
                format!("error emitted with {} argument(s)", args.len())
            }
            _ => return,
        };
        match self.unobserved_errors {
            UnobservedErrors::Panic => panic!("Unobserved state machine error: {message}"),
            UnobservedErrors::Log => error!(error = %message, "Unobserved state machine error"),
        }
    }

    fn listener_count(&self, channel: &Channel) -> usize {
        self.listeners.iter().filter(|(own, _)| own == channel).count()
    }
}

#[cfg(feature = "tokio-integration")]
pub use forwarding::{forward, Record};

#[cfg(feature = "tokio-integration")]
mod forwarding {
    use tokio::sync::mpsc::UnboundedSender;
    use tracing::trace;

    use super::Notification;
    use crate::error::DispatchError;

    /// Owned copy of a [`Notification`] that can cross task boundaries.
    /// States are identified by their map keys.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Record<A> {
        /// A debug message
        Debug(String),
        /// A state change between two keys
        Transition {
            /// Key of the previous state, `None` on the first transition
            from: Option<String>,
            /// Key of the new state
            to: String,
        },
        /// A runtime error
        Error(DispatchError),
        /// An application defined message
        Custom {
            /// Channel name
            channel: String,
            /// Cloned arguments
            args: Vec<A>,
        },
    }

    impl<CTX, A: Clone> From<&Notification<'_, CTX, A>> for Record<A> {
        fn from(notification: &Notification<'_, CTX, A>) -> Self {
            match notification {
                Notification::Debug(message) => Record::Debug(message.to_string()),
                Notification::Transition { from, to } => Record::Transition {
                    from: from.map(|s| s.key().to_string()),
                    to: to.key().to_string(),
                },
                Notification::Error(err) => Record::Error((*err).clone()),
                Notification::Custom { channel, args } => Record::Custom {
                    channel: channel.to_string(),
                    args: args.to_vec(),
                },
            }
        }
    }

    /// Build a listener that forwards every notification it receives to `tx`.
    ///
    /// Subscribe it to each channel that should be observed from another task.
    /// Records sent after the receiver is dropped are discarded.
    pub fn forward<CTX, A>(tx: UnboundedSender<Record<A>>) -> impl FnMut(&Notification<'_, CTX, A>) + 'static
    where
        CTX: 'static,
        A: Clone + 'static,
    {
        move |notification: &Notification<'_, CTX, A>| {
            if tx.send(Record::from(notification)).is_err() {
                trace!("notification receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestEmitter = Emitter<(), String>;

    #[test]
    fn test_channel_names() {
        assert_eq!(Channel::from("debug"), Channel::Debug);
        assert_eq!(Channel::from("transition"), Channel::Transition);
        assert_eq!(Channel::from("error"), Channel::Error);
        assert_eq!(Channel::from("connecting"), Channel::Custom("connecting".to_string()));
        assert_eq!(Channel::Custom("connecting".to_string()).to_string(), "connecting");
    }

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = TestEmitter::new();

        for id in 0..3 {
            let seen = Rc::clone(&seen);
            emitter.subscribe(
                Channel::Debug,
                Box::new(move |n: &Notification<'_, (), String>| {
                    if let Notification::Debug(message) = n {
                        seen.borrow_mut().push(format!("{id}:{message}"));
                    }
                }),
            );
        }

        emitter.publish(&Notification::Debug("hello"));
        assert_eq!(*seen.borrow(), vec!["0:hello", "1:hello", "2:hello"]);
    }

    #[test]
    fn test_custom_channels_are_isolated() {
        let hits = Rc::new(RefCell::new(0));
        let mut emitter = TestEmitter::new();
        let counter = Rc::clone(&hits);
        emitter.subscribe(Channel::from("connecting"), Box::new(move |_: &Notification<'_, (), String>| *counter.borrow_mut() += 1));

        let args = vec!["tcp".to_string()];
        emitter.publish(&Notification::Custom { channel: "connecting", args: &args });
        emitter.publish(&Notification::Custom { channel: "closing", args: &args });
        emitter.publish(&Notification::Debug("connecting"));

        assert_eq!(*hits.borrow(), 1);
        assert_eq!(emitter.listener_count(&Channel::from("connecting")), 1);
        assert_eq!(emitter.listener_count(&Channel::Error), 0);
    }

    #[test]
    fn test_custom_messages_on_builtin_names_reach_builtin_channels() {
        let args = vec!["boom".to_string()];
        let error: Notification<'_, (), String> = Notification::Custom { channel: "error", args: &args };
        let debug: Notification<'_, (), String> = Notification::Custom { channel: "debug", args: &args };

        assert_eq!(error.channel(), Channel::Error);
        assert!(error.is_on(&Channel::Error));
        assert!(debug.is_on(&Channel::Debug));
        assert!(!debug.is_on(&Channel::Custom("debug".to_string())));
    }

    #[test]
    #[should_panic(expected = "Unobserved state machine error: error emitted with 1 argument(s)")]
    fn test_unobserved_custom_error_panics() {
        let mut emitter = TestEmitter::new();
        let args = vec!["boom".to_string()];
        emitter.publish(&Notification::Custom { channel: "error", args: &args });
    }

    #[test]
    #[should_panic(expected = "No event 'ping' in state 'B'")]
    fn test_unobserved_error_panics_by_default() {
        let mut emitter = TestEmitter::new();
        let err = DispatchError::NoEvent {
            event: "ping".to_string(),
            state: "B".to_string(),
        };
        emitter.publish(&Notification::Error(&err));
    }

    #[test]
    fn test_unobserved_error_can_be_logged() {
        let mut emitter = TestEmitter::with_policy(UnobservedErrors::Log);
        let err = DispatchError::NoActiveState {
            event: "ping".to_string(),
        };
        emitter.publish(&Notification::Error(&err));
        assert_eq!(emitter.unobserved_errors(), UnobservedErrors::Log);
    }

    #[test]
    fn test_observed_error_does_not_panic() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = TestEmitter::new();
        let sink = Rc::clone(&seen);
        emitter.subscribe(
            Channel::Error,
            Box::new(move |n: &Notification<'_, (), String>| {
                if let Notification::Error(err) = n {
                    sink.borrow_mut().push(err.to_string());
                }
            }),
        );

        let err = DispatchError::NoEvent {
            event: "ping".to_string(),
            state: "B".to_string(),
        };
        emitter.publish(&Notification::Error(&err));
        assert_eq!(*seen.borrow(), vec!["No event 'ping' in state 'B'"]);
    }
}
