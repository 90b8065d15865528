//! High-level operations composed from the core modules.

pub mod build;

pub use build::{
    build_from_manifest, write_upgrade_pack, BuildContext, BuildError, BuildOutcome, BuildResult,
    BuiltImage, InputRequest,
};
