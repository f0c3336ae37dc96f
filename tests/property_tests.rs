//! Property-based tests for the state machine engine.
//!
//! These tests use proptest to check that transition and dispatch rules
//! hold across randomly generated state maps and inputs.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use named_fsm::{Definitions, Notification, StateDefinition, StateMachine};
use proptest::prelude::*;

type Machine = StateMachine<Journal, i64>;

/// Everything the machine did, in order
#[derive(Debug, Default)]
struct Journal {
    actions: Vec<String>,
    handled: Vec<(String, Vec<i64>)>,
}

#[derive(Debug, Default)]
struct Seen {
    debug: Vec<String>,
    transitions: usize,
    errors: Vec<String>,
}

prop_compose! {
    fn arbitrary_keys()(keys in prop::collection::btree_set("[A-Z]{1,6}", 1..6)) -> Vec<String> {
        keys.into_iter().collect()
    }
}

prop_compose! {
    fn arbitrary_events()(events in prop::collection::btree_set("[a-z]{1,5}", 0..4)) -> BTreeSet<String> {
        events
    }
}

fn build(keys: &[String], events: &BTreeSet<String>) -> Machine {
    let mut defs = Definitions::new();
    for key in keys {
        let enter_tag = format!("enter {key}");
        let exit_tag = format!("exit {key}");
        let mut state = StateDefinition::new(key.to_lowercase())
            .on_enter(move |m: &mut Machine| m.context_mut().actions.push(enter_tag.clone()))
            .on_exit(move |m: &mut Machine| m.context_mut().actions.push(exit_tag.clone()));
        for event in events {
            let name = event.clone();
            state = state.on_event(event.clone(), move |m: &mut Machine, args: &[i64]| {
                m.context_mut().handled.push((name.clone(), args.to_vec()));
            });
        }
        defs.insert(key.clone(), state);
    }
    StateMachine::new(Journal::default(), defs).unwrap()
}

fn observe(fsm: &mut Machine) -> Rc<RefCell<Seen>> {
    let seen = Rc::new(RefCell::new(Seen::default()));
    for channel in ["debug", "transition", "error"] {
        let sink = Rc::clone(&seen);
        fsm.subscribe(channel, move |n: &Notification<'_, Journal, i64>| {
            let mut sink = sink.borrow_mut();
            match n {
                Notification::Debug(message) => sink.debug.push(message.to_string()),
                Notification::Transition { .. } => sink.transitions += 1,
                Notification::Error(err) => sink.errors.push(err.to_string()),
                Notification::Custom { .. } => {}
            }
        });
    }
    seen
}

proptest! {
    #[test]
    fn well_formed_maps_validate(keys in arbitrary_keys(), events in arbitrary_events()) {
        let mut defs: Definitions<(), ()> = Definitions::new();
        for key in &keys {
            let mut state = StateDefinition::new(key.clone());
            for event in &events {
                state = state.on_event(event.clone(), |_, _| {});
            }
            defs.insert(key.clone(), state);
        }

        prop_assert!(StateMachine::validate(&defs).is_ok());
        let handles: Vec<_> = keys.iter().map(|k| Rc::clone(&defs[k.as_str()])).collect();
        let fsm = StateMachine::new((), defs).unwrap();
        for (key, handle) in keys.iter().zip(&handles) {
            prop_assert!(Rc::ptr_eq(handle, &fsm.definitions()[key.as_str()]));
        }
    }

    #[test]
    fn first_transition_never_exits(keys in arbitrary_keys(), pick in any::<prop::sample::Index>()) {
        let mut fsm = build(&keys, &BTreeSet::new());
        let seen = observe(&mut fsm);
        let key = &keys[pick.index(keys.len())];

        prop_assert!(fsm.transition_to_key(key));

        prop_assert_eq!(&fsm.context().actions, &vec![format!("enter {key}")]);
        prop_assert_eq!(seen.borrow().transitions, 1);
    }

    #[test]
    fn same_state_is_a_no_op(keys in arbitrary_keys(), pick in any::<prop::sample::Index>()) {
        let mut fsm = build(&keys, &BTreeSet::new());
        let key = &keys[pick.index(keys.len())];
        fsm.transition_to_key(key);
        let seen = observe(&mut fsm);

        prop_assert!(!fsm.transition_to_key(key));

        let seen = seen.borrow();
        prop_assert_eq!(&seen.debug, &vec![format!("State is already {}", key.to_lowercase())]);
        prop_assert_eq!(seen.transitions, 0);
        prop_assert_eq!(fsm.context().actions.len(), 1);
        prop_assert!(fsm.is_in(key));
    }

    #[test]
    fn exit_precedes_enter(keys in arbitrary_keys(), path in prop::collection::vec(any::<prop::sample::Index>(), 1..12)) {
        let mut fsm = build(&keys, &BTreeSet::new());
        let seen = observe(&mut fsm);

        let mut expected = Vec::new();
        let mut current: Option<&String> = None;
        let mut changes = 0;
        for pick in &path {
            let key = &keys[pick.index(keys.len())];
            let changed = fsm.transition_to_key(key);
            prop_assert_eq!(changed, current != Some(key));
            if changed {
                if let Some(previous) = current {
                    expected.push(format!("exit {previous}"));
                }
                expected.push(format!("enter {key}"));
                current = Some(key);
                changes += 1;
            }
        }

        prop_assert_eq!(&fsm.context().actions, &expected);
        prop_assert_eq!(seen.borrow().transitions, changes);
    }

    #[test]
    fn handlers_receive_arguments_unchanged(
        keys in arbitrary_keys(),
        events in arbitrary_events(),
        calls in prop::collection::vec(prop::collection::vec(any::<i64>(), 0..5), 1..6),
    ) {
        prop_assume!(!events.is_empty());
        let mut fsm = build(&keys, &events);
        fsm.transition_to_key(&keys[0]);

        let mut expected = Vec::new();
        for (event, args) in events.iter().cycle().zip(&calls) {
            fsm.dispatch_event(event, args);
            expected.push((event.clone(), args.clone()));
        }

        prop_assert_eq!(&fsm.context().handled, &expected);
    }

    #[test]
    fn unhandled_events_report_exactly_once(
        keys in arbitrary_keys(),
        events in arbitrary_events(),
        unknown in "[0-9]{1,4}",
    ) {
        let mut fsm = build(&keys, &events);
        let seen = observe(&mut fsm);
        fsm.transition_to_key(&keys[0]);

        fsm.dispatch_event(&unknown, &[1, 2, 3]);

        let seen = seen.borrow();
        prop_assert_eq!(seen.errors.len(), 1);
        prop_assert!(seen.errors[0].contains(&unknown));
        prop_assert!(seen.errors[0].contains(&keys[0].to_lowercase()));
        prop_assert!(fsm.context().handled.is_empty());
    }
}
