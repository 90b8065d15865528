use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pack_core::pack::PackView;

/// Print the decoded layout of a pack file.
pub fn inspect_command(pack: &Path, json: bool) -> Result<()> {
    let bytes =
        fs::read(pack).with_context(|| format!("Failed to read pack {}", pack.display()))?;
    let view = PackView::parse(&bytes)
        .with_context(|| format!("Failed to decode pack {}", pack.display()))?;
    let summary = view.summary();

    if json {
        let serialized = serde_json::to_string_pretty(&summary)?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Upgrade pack: {}", pack.display());
    println!("  Product: {} {}", summary.product_name, summary.product_version);
    println!("  Component: {} v{}", summary.component_name, summary.component_version);
    println!("  Header version: {}", summary.header_version);
    println!("  Header length: {} bytes", summary.header_length);
    println!("  Status: 0x{:08X}", summary.status);
    println!("  Error code: 0x{:08X}", summary.error_code);
    println!(
        "  Signature: method {}, {} bytes",
        summary.signature_method, summary.signature_length
    );
    println!("  Signed contents: {} bytes", summary.signed_contents_length);
    println!("Images:");
    if summary.images.is_empty() {
        println!("(none)");
    }
    for image in &summary.images {
        println!(
            "- {} (method: {}, block: {} bytes at offset {}, payload: {} bytes)",
            image.target, image.method, image.total_size, image.offset, image.payload_len
        );
    }

    Ok(())
}
