use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use pack_core::io::StdFileSystem;
use pack_core::services::{build_from_manifest, BuiltImage};
use rand_core::{CryptoRngCore, OsRng};
use serde::{Deserialize, Serialize};

use crate::{load_manifest, sha256_bytes};

/// Written next to a pack by `build --report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub product: String,
    pub product_version: String,
    pub component: String,
    pub component_version: u32,
    pub output: String,
    pub pack_size: usize,
    pub pack_sha256: String,
    pub security: String,
    pub signer: String,
    pub signature_length: usize,
    pub images: Vec<ReportImage>,
    pub built_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportImage {
    pub target: String,
    pub kind: String,
    pub block_len: usize,
}

impl From<&BuiltImage> for ReportImage {
    fn from(image: &BuiltImage) -> Self {
        Self {
            target: image.target.clone(),
            kind: image.kind.to_string(),
            block_len: image.block_len,
        }
    }
}

/// Build the pack described by `manifest` into `output`.
pub fn build_command(manifest: &Path, output: &Path, report: Option<&Path>) -> Result<()> {
    let report_data = build_pack(manifest, output, &mut OsRng)?;

    println!("Built upgrade pack:");
    println!("  Output: {}", report_data.output);
    println!("  Size: {} bytes", report_data.pack_size);
    println!("  SHA-256: {}", report_data.pack_sha256);
    println!("  Security: {}", report_data.security);
    println!("  Signer: {} ({} byte signature)", report_data.signer, report_data.signature_length);
    println!("  Images:");
    if report_data.images.is_empty() {
        println!("  (none)");
    }
    for image in &report_data.images {
        println!("  - {} ({}, {} bytes)", image.target, image.kind, image.block_len);
    }

    if let Some(report_path) = report {
        let json = serde_json::to_string_pretty(&report_data)?;
        fs::write(report_path, json).with_context(|| {
            format!("Failed to write build report to {}", report_path.display())
        })?;
        println!("  Report: {}", report_path.display());
    }

    Ok(())
}

/// Build with an explicit RNG and return the report without printing.
pub fn build_pack(
    manifest_path: &Path,
    output: &Path,
    rng: &mut dyn CryptoRngCore,
) -> Result<BuildReport> {
    let manifest = load_manifest(manifest_path)?;
    let outcome = build_from_manifest(&manifest, &StdFileSystem, output, rng)
        .with_context(|| format!("Failed to build pack from {}", manifest_path.display()))?;
    info!("built {} from {}", output.display(), manifest_path.display());

    let signature_length = outcome.pack.signature().len();
    let bytes = outcome.pack.as_bytes();
    Ok(BuildReport {
        product: manifest.product.name.clone(),
        product_version: manifest.product.version.clone(),
        component: manifest.component.name.clone(),
        component_version: manifest.component.version,
        output: output.display().to_string(),
        pack_size: bytes.len(),
        pack_sha256: sha256_bytes(bytes),
        security: outcome.security.to_string(),
        signer: outcome.signer.to_string(),
        signature_length,
        images: outcome.images.iter().map(ReportImage::from).collect(),
        built_at: Utc::now().to_rfc3339(),
    })
}
