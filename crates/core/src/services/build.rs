use std::path::{Path, PathBuf};

use log::info;
use rand_core::CryptoRngCore;
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, PackManifest};
use crate::input::InputError;
use crate::io::{FileSystem, FsError};
use crate::pack::{LayoutError, PackHeader, UpgradePack, UpgradePackBuilder};
use crate::security::ImageSecurity;
use crate::signer::ImageSigner;
use crate::targets::{FactoryError, InputFactory, RegistryError, SupportedTargets};

/// Any failure of a pack build. Nothing is written when one is returned.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Fs(#[from] FsError),
}

pub type BuildResult<T> = Result<T, BuildError>;

/// One requested component of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRequest {
    pub target: String,
    pub file: Option<PathBuf>,
    pub address: Option<u32>,
}

impl InputRequest {
    pub fn file(target: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self { target: target.into(), file: Some(file.into()), address: None }
    }

    pub fn command(target: impl Into<String>) -> Self {
        Self { target: target.into(), file: None, address: None }
    }

    pub fn at(mut self, address: u32) -> Self {
        self.address = Some(address);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltImage {
    pub target: String,
    pub kind: &'static str,
    pub block_len: usize,
}

#[derive(Debug)]
pub struct BuildOutcome {
    pub pack: UpgradePack,
    pub images: Vec<BuiltImage>,
    pub signer: &'static str,
    pub security: &'static str,
}

/// Everything a build needs besides the requests and the RNG.
pub struct BuildContext<'a> {
    pub registry: &'a SupportedTargets,
    pub header: &'a PackHeader,
    pub security: &'a dyn ImageSecurity,
    pub signer: &'a dyn ImageSigner,
    pub fs: &'a dyn FileSystem,
}

impl BuildContext<'_> {
    /// Validate the request list against the registry, create one input per
    /// request, and assemble, sign and self-verify the pack in memory.
    pub fn build(
        &self,
        requests: &[InputRequest],
        rng: &mut dyn CryptoRngCore,
    ) -> BuildResult<BuildOutcome> {
        self.registry.check_selection(requests.iter().map(|r| r.target.as_str()))?;

        let factory = InputFactory::new(self.registry, self.security, self.fs);
        let mut inputs = Vec::with_capacity(requests.len());
        for request in requests {
            let input =
                factory.create_input(&request.target, request.file.as_deref(), request.address)?;
            inputs.push(input);
        }
        info!("{} inputs created", inputs.len());

        let mut builder =
            UpgradePackBuilder::new(self.header, inputs.len(), self.signer.signature_len())?;
        let mut images = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let block = input.image(rng)?;
            builder.append_image(&block)?;
            let target = input.target_name().as_str();
            images.push(BuiltImage {
                target: target.to_string(),
                kind: self.registry.kind_of(target).map(|k| k.as_str()).unwrap_or("unknown"),
                block_len: block.len(),
            });
        }

        let pack = builder.sign(self.signer, rng)?;
        Ok(BuildOutcome {
            pack,
            images,
            signer: self.signer.algorithm(),
            security: self.security.method().as_str(),
        })
    }

    /// `build`, then write the pack. The file is only touched once the pack
    /// has been signed and verified.
    pub fn build_to_file(
        &self,
        requests: &[InputRequest],
        output: &Path,
        rng: &mut dyn CryptoRngCore,
    ) -> BuildResult<BuildOutcome> {
        let outcome = self.build(requests, rng)?;
        write_upgrade_pack(self.fs, output, &outcome.pack)?;
        Ok(outcome)
    }
}

pub fn write_upgrade_pack(
    fs: &dyn FileSystem,
    output: &Path,
    pack: &UpgradePack,
) -> BuildResult<()> {
    fs.write_bytes(output, pack.as_bytes())?;
    info!("wrote {} ({} bytes)", output.display(), pack.len());
    Ok(())
}

/// Build the pack a manifest describes and write it to `output`.
pub fn build_from_manifest(
    manifest: &PackManifest,
    fs: &dyn FileSystem,
    output: &Path,
    rng: &mut dyn CryptoRngCore,
) -> BuildResult<BuildOutcome> {
    let registry = manifest.to_registry()?;
    let security = manifest.to_security()?;
    let signer = manifest.to_signer()?;
    let header = manifest.header();
    let context = BuildContext {
        registry: &registry,
        header: &header,
        security: security.as_ref(),
        signer: signer.as_ref(),
        fs,
    };
    context.build_to_file(&manifest.requests(), output, rng)
}
