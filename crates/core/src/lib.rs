//! pack-core
//!
//! Core library for assembling signed firmware upgrade packs.
//!
//! A pack carries one image block per requested target, each optionally
//! encrypted and authenticated, behind a header and a single signature over
//! the whole content. This crate holds the sparse memory model, the HEX and
//! ELF loaders, the security and signing strategies, the target registry and
//! the pack layout, so every frontend builds byte-identical packs.

pub mod binary;
pub mod config;
pub mod input;
pub mod io;
pub mod memory;
pub mod pack;
pub mod security;
pub mod services;
pub mod signer;
pub mod targets;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
