use std::path::Path;

use anyhow::{Context, Result};
use pack_core::config::PackManifest;
use pack_core::io::StdFileSystem;
use sha2::{Digest, Sha256};

pub mod commands;

/// Hex-encoded SHA-256 of `bytes`.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Load and validate a manifest from disk.
pub fn load_manifest(path: &Path) -> Result<PackManifest> {
    PackManifest::load(&StdFileSystem, path)
        .with_context(|| format!("Failed to load pack manifest {}", path.display()))
}

/// Log filter for a `-v` count: warnings by default, then info, then debug.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}
