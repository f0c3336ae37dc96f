//! PlantUML diagram generation

use crate::state::{Definitions, StateRef};

/// Generate a PlantUML diagram from the state map and the transition log
pub fn generate_plantuml<CTX, A>(
    definitions: &Definitions<CTX, A>,
    transition_log: &[(Option<String>, String)],
    current_state: Option<&StateRef<CTX, A>>,
) -> String {
    let mut plantuml = String::new();
    plantuml.push_str("@startuml\n");
    plantuml.push_str("skinparam state {\n");
    plantuml.push_str("  BackgroundColor<<Current>> YellowGreen\n");
    plantuml.push_str("}\n\n");

    // Declare every state with its events
    for key in definitions.keys() {
        let state = &definitions[key];
        let alias = alias(key);
        plantuml.push_str(&format!("state \"{}\" as {}\n", state.name(), alias));

        let mut events: Vec<&str> = state.events().collect();
        events.sort_unstable();
        for event in events {
            plantuml.push_str(&format!("{} : on {}\n", alias, event));
        }
    }

    if !transition_log.is_empty() {
        plantuml.push('\n');
    }

    // Add transitions
    for (from, to) in transition_log {
        let from = from.as_deref().map_or_else(|| "[*]".to_string(), alias);
        plantuml.push_str(&format!("{} --> {}\n", from, alias(to)));
    }

    // Mark current state
    if let Some(current) = current_state {
        plantuml.push_str(&format!("state {} <<Current>>\n", alias(current.key())));
    }

    plantuml.push_str("@enduml\n");
    plantuml
}

// PlantUML aliases must be plain identifiers
fn alias(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
