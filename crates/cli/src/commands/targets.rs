use std::path::Path;

use anyhow::{Context, Result};

use crate::load_manifest;

/// List the registry a manifest declares.
pub fn targets_command(manifest_path: &Path, json: bool) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let registry = manifest.to_registry().context("Failed to build target registry")?;

    if json {
        let targets: Vec<_> = registry.iter().collect();
        let serialized = serde_json::to_string_pretty(&targets)?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Targets:");
    if registry.is_empty() {
        println!("(none)");
        return Ok(());
    }
    for target in registry.iter() {
        let offset = target
            .kind
            .offset()
            .map(|o| format!("0x{:08X}", o))
            .unwrap_or_else(|| "-".to_string());
        let order = target.order.map(|o| o.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "- {} (kind: {}, offset: {}, mandatory: {}, order: {})",
            target.name,
            target.kind.as_str(),
            offset,
            target.mandatory,
            order
        );
    }

    Ok(())
}
