use std::path::Path;

use log::debug;
use thiserror::Error;

use super::{RegistryError, SupportedTargets, TargetKind};
use crate::input::{BinaryInput, CommandInput, ElfInput, HexInput, Input, InputError, TargetName};
use crate::io::FileSystem;
use crate::security::ImageSecurity;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Target '{0}' needs an input file")]
    MissingFile(String),

    #[error(transparent)]
    Input(#[from] InputError),
}

/// Turns `(target, file, address)` requests into inputs using the registry
/// to pick the input kind. All inputs share one security strategy.
pub struct InputFactory<'a> {
    registry: &'a SupportedTargets,
    security: &'a dyn ImageSecurity,
    fs: &'a dyn FileSystem,
}

impl<'a> InputFactory<'a> {
    pub fn new(
        registry: &'a SupportedTargets,
        security: &'a dyn ImageSecurity,
        fs: &'a dyn FileSystem,
    ) -> Self {
        Self { registry, security, fs }
    }

    /// `address`, when given, replaces the registry's base: the destination
    /// of a binary, or the file offset of a HEX or ELF image. Command
    /// targets ignore both `file` and `address`.
    pub fn create_input(
        &self,
        target: &str,
        file: Option<&Path>,
        address: Option<u32>,
    ) -> Result<Box<dyn Input + 'a>, FactoryError> {
        let info = self
            .registry
            .get(target)
            .ok_or_else(|| RegistryError::UnknownTarget(target.to_string()))?;
        let name: TargetName = info.name.clone();

        if let TargetKind::Command = info.kind {
            debug!("command input '{}'", name);
            return Ok(Box::new(CommandInput::new(name)));
        }

        let file = file.ok_or_else(|| FactoryError::MissingFile(target.to_string()))?;
        let input: Box<dyn Input + 'a> = match info.kind {
            TargetKind::Hex => Box::new(HexInput::from_file(
                self.fs,
                file,
                name,
                address.unwrap_or(0),
                self.security,
            )?),
            TargetKind::Elf { offset } => Box::new(ElfInput::from_file(
                self.fs,
                file,
                name,
                address.unwrap_or(offset),
                self.security,
            )?),
            TargetKind::Bin { offset } => Box::new(BinaryInput::from_file(
                self.fs,
                file,
                name,
                address.unwrap_or(offset),
                self.security,
            )?),
            TargetKind::Command => Box::new(CommandInput::new(name)),
        };
        Ok(input)
    }
}
