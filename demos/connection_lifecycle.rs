//! Connection lifecycle example
//!
//! This example models a client connection with four states:
//! - Closed: No connection
//! - Connecting: Handshake in progress, retried a limited number of times
//! - Open: Connection established and receiving data
//! - Draining: Connection closing after flushing pending data
//!
//! The example shows:
//! - Loading a declarative state map from JSON
//! - Binding named actions and handlers through an action registry
//! - Handlers transitioning the machine from inside an event
//! - Observing debug, transition, error and custom notifications
//! - PlantUML diagram export

use named_fsm::{
    ActionRegistry, Definitions, Notification, StateMachine, StateMachineBuilder, UnobservedErrors,
};

const STATES: &str = r#"{
    "CLOSED": {
        "name": "Closed",
        "events": { "open": "start_connecting" }
    },
    "CONNECTING": {
        "name": "Connecting",
        "enter": "count_attempt",
        "events": { "connected": "go_open", "failed": "retry_or_close" }
    },
    "OPEN": {
        "name": "Open",
        "events": { "data": "receive", "close": "go_draining" }
    },
    "DRAINING": {
        "name": "Draining",
        "enter": "flush",
        "exit": "report_flushed"
    }
}"#;

#[derive(Debug)]
struct Link {
    attempts: u32,
    max_attempts: u32,
    pending: Vec<String>,
}

type Connection = StateMachine<Link, String>;

fn registry() -> ActionRegistry<Link, String> {
    ActionRegistry::new()
        .handler("start_connecting", |fsm: &mut Connection, _args: &[String]| {
            fsm.context_mut().attempts = 0;
            fsm.transition_to_key("CONNECTING");
        })
        .action("count_attempt", |fsm: &mut Connection| {
            fsm.context_mut().attempts += 1;
            let attempt = fsm.context().attempts.to_string();
            fsm.emit("attempt", &[attempt]);
        })
        .handler("go_open", |fsm: &mut Connection, _args: &[String]| {
            fsm.transition_to_key("OPEN");
        })
        .handler("retry_or_close", |fsm: &mut Connection, args: &[String]| {
            println!("  handshake failed: {}", args.join(" "));
            if fsm.context().attempts < fsm.context().max_attempts {
                fsm.context_mut().attempts += 1;
                let attempt = fsm.context().attempts.to_string();
                fsm.emit("attempt", &[attempt]);
            } else {
                fsm.transition_to_key("CLOSED");
            }
        })
        .handler("receive", |fsm: &mut Connection, args: &[String]| {
            fsm.context_mut().pending.extend_from_slice(args);
        })
        .handler("go_draining", |fsm: &mut Connection, _args: &[String]| {
            fsm.transition_to_key("DRAINING");
        })
        .action("flush", |fsm: &mut Connection| {
            let flushed: Vec<String> = fsm.context_mut().pending.drain(..).collect();
            println!("  flushing {} message(s): {:?}", flushed.len(), flushed);
            fsm.transition_to_key("CLOSED");
        })
        .action("report_flushed", |fsm: &mut Connection| {
            println!("  drained, {} message(s) left", fsm.context().pending.len());
        })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("🔌 Connection Lifecycle Example");
    println!("==============================\n");

    let definitions = Definitions::from_json_str(STATES, &registry())?;
    let mut fsm = StateMachineBuilder::new(Link {
        attempts: 0,
        max_attempts: 2,
        pending: Vec::new(),
    })
    .definitions(definitions)
    .unobserved_errors(UnobservedErrors::Log)
    .build()?;

    fsm.subscribe("transition", |n: &Notification<'_, Link, String>| {
        if let Notification::Transition { from, to } = n {
            let from = from.map_or("∅", |s| s.name());
            println!("➡️  {} -> {}", from, to.name());
        }
    });
    fsm.subscribe("debug", |n: &Notification<'_, Link, String>| {
        if let Notification::Debug(message) = n {
            println!("   debug: {}", message);
        }
    });
    fsm.subscribe("error", |n: &Notification<'_, Link, String>| {
        if let Notification::Error(err) = n {
            println!("⚠️  {}", err);
        }
    });
    fsm.subscribe("attempt", |n: &Notification<'_, Link, String>| {
        if let Notification::Custom { args, .. } = n {
            println!("   connection attempt #{}", args.join(""));
        }
    });

    println!("1. Start closed");
    fsm.transition_to_key("CLOSED");

    println!("\n2. Open and fail the handshake once");
    fsm.dispatch_event("open", &[]);
    fsm.dispatch_event("failed", &["timeout".to_string()]);

    println!("\n3. Handshake succeeds");
    fsm.dispatch_event("connected", &[]);

    println!("\n4. Receive data");
    fsm.dispatch_event("data", &["hello".to_string(), "world".to_string()]);

    println!("\n5. Unknown event is reported, not fatal");
    fsm.dispatch_event("reconnect", &[]);

    println!("\n6. Re-entering the current state is a no-op");
    fsm.transition_to_key("OPEN");

    println!("\n7. Close: drain then return to Closed");
    fsm.dispatch_event("close", &[]);

    println!(
        "\nFinal state: {}",
        fsm.current_state().map_or("none", |s| s.name())
    );
    println!("Context: {:?}", fsm.context());

    println!("\n📊 PlantUML Diagram:");
    println!("{}", fsm.export_plantuml());

    Ok(())
}
