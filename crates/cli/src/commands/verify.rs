use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::warn;
use pack_core::pack::layout::field_text;
use pack_core::pack::PackView;

use crate::load_manifest;

/// Check a pack against the signer and security keys of a manifest.
///
/// Image payloads secured with the manifest's method are opened too, which
/// catches MAC mismatches for authenticated methods.
pub fn verify_command(manifest_path: &Path, pack: &Path) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let signer = manifest.to_signer().context("Failed to load signer from manifest")?;
    let security = manifest.to_security().context("Failed to load security from manifest")?;

    let bytes =
        fs::read(pack).with_context(|| format!("Failed to read pack {}", pack.display()))?;
    let view = PackView::parse(&bytes)
        .with_context(|| format!("Failed to decode pack {}", pack.display()))?;

    let method = view.prologue().signature_method.get();
    if method != signer.method().code() {
        return Err(anyhow!(
            "Pack uses signature method {} but the manifest signer ({}) uses {}",
            method,
            signer.algorithm(),
            signer.method().code()
        ));
    }
    if view.signature().len() != signer.signature_len() {
        return Err(anyhow!(
            "Pack signature is {} bytes but {} signatures are {} bytes",
            view.signature().len(),
            signer.algorithm(),
            signer.signature_len()
        ));
    }
    if !signer.check_signature(view.signature(), view.signed_region()) {
        return Err(anyhow!("Signature check failed for {}", pack.display()));
    }

    let product = field_text(&view.epilogue().product_name);
    if product != manifest.product.name {
        warn!(
            "pack product '{}' differs from manifest product '{}'",
            product, manifest.product.name
        );
    }

    let mut opened = 0;
    for image in view.images() {
        if image.payload.is_empty() || image.method() != Some(security.method()) {
            continue;
        }
        security
            .open(image.payload)
            .with_context(|| format!("Image '{}' failed to open", image.target_name))?;
        opened += 1;
    }

    println!("Pack {} verified:", pack.display());
    println!("  Signer: {}", signer.algorithm());
    println!(
        "  Images: {} ({} opened with {})",
        view.images().len(),
        opened,
        security.method().as_str()
    );

    Ok(())
}
