//! Validate command implementation.

use objlock_core::{IsolationLevel, IsolationRegistry};
use std::path::Path;
use tracing::info;

/// Runs the validate command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let registry = IsolationRegistry::load(path)?;
    info!(path = %path.display(), classes = registry.len(), "isolation map loaded");

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&to_json(&registry))?),
        "text" => print_text(path, &registry),
        other => return Err(format!("Unknown output format: {other}").into()),
    }

    Ok(())
}

fn sorted_classes(registry: &IsolationRegistry) -> Vec<(&str, IsolationLevel)> {
    let mut classes: Vec<_> = registry.iter().collect();
    classes.sort_by(|a, b| a.0.cmp(b.0));
    classes
}

fn to_json(registry: &IsolationRegistry) -> serde_json::Value {
    let classes: serde_json::Map<String, serde_json::Value> = sorted_classes(registry)
        .into_iter()
        .map(|(class, level)| (class.to_string(), level.name().into()))
        .collect();
    serde_json::json!({
        "default": registry.default_level().map(IsolationLevel::name),
        "classes": classes,
    })
}

fn print_text(path: &Path, registry: &IsolationRegistry) {
    println!("Isolation map {:?}", path);
    println!();
    match registry.default_level() {
        Some(level) => println!("Default level: {}", level),
        None => println!("Default level: (none, unlisted classes are rejected)"),
    }
    println!("Classes: {}", registry.len());

    let classes = sorted_classes(registry);
    let width = classes.iter().map(|(c, _)| c.len()).max().unwrap_or(0);
    for (class, level) in classes {
        let locking = if level.uses_lock_table() {
            "pessimistic"
        } else {
            "no locking"
        };
        println!("  {class:<width$}  {:<12}  {locking}", level.name());
    }

    println!();
    println!("✓ Isolation map is valid");
}
