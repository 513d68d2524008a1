//! `contextkeeper providers` — List built-in providers.

use contextkeeper_providers::defaults;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("{:<14} {:>8}  relevant triggers", "provider", "priority");
    for provider in defaults() {
        let triggers: Vec<String> = provider
            .relevant_triggers()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "{:<14} {:>8.2}  {}",
            provider.name(),
            provider.priority(),
            triggers.join(", ")
        );
    }
    Ok(())
}
