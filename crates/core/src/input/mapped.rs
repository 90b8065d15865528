//! Inputs backed by address-mapped image formats.
//!
//! Both parse into a `BinaryObject` up front, so format errors surface when
//! the input is created rather than when the pack is assembled.

use std::path::Path;

use log::debug;
use rand_core::CryptoRngCore;

use super::{BinaryInput, Input, InputResult, TargetName};
use crate::binary::{BinaryObject, ERASED_BYTE};
use crate::io::FileSystem;
use crate::security::ImageSecurity;

/// Intel-HEX image. Gaps between records are filled with erased flash.
pub struct HexInput<'a> {
    target: TargetName,
    object: BinaryObject,
    security: &'a dyn ImageSecurity,
}

impl<'a> HexInput<'a> {
    pub fn new(target: TargetName, object: BinaryObject, security: &'a dyn ImageSecurity) -> Self {
        Self { target, object, security }
    }

    pub fn from_file(
        fs: &dyn FileSystem,
        path: &Path,
        target: TargetName,
        file_offset: u32,
        security: &'a dyn ImageSecurity,
    ) -> InputResult<Self> {
        let lines = fs.read_lines(path)?;
        let object = BinaryObject::from_hex_lines(path.display().to_string(), &lines, file_offset)?;
        debug!(
            "{}: {} bytes in {} runs for '{}'",
            path.display(),
            object.memory().len(),
            object.memory().bucket_count(),
            target
        );
        Ok(Self::new(target, object, security))
    }

    pub fn object(&self) -> &BinaryObject {
        &self.object
    }
}

impl Input for HexInput<'_> {
    fn target_name(&self) -> &TargetName {
        &self.target
    }

    fn image(&self, rng: &mut dyn CryptoRngCore) -> InputResult<Vec<u8>> {
        let (data, start) = self.object.linearize_padded(ERASED_BYTE);
        BinaryInput::new(self.target.clone(), data, start, self.security).image(rng)
    }
}

/// ELF image. Loadable segments are concatenated without padding.
pub struct ElfInput<'a> {
    target: TargetName,
    object: BinaryObject,
    security: &'a dyn ImageSecurity,
}

impl<'a> ElfInput<'a> {
    pub fn new(target: TargetName, object: BinaryObject, security: &'a dyn ImageSecurity) -> Self {
        Self { target, object, security }
    }

    pub fn from_file(
        fs: &dyn FileSystem,
        path: &Path,
        target: TargetName,
        file_offset: u32,
        security: &'a dyn ImageSecurity,
    ) -> InputResult<Self> {
        let bytes = fs.read_bytes(path)?;
        let object = BinaryObject::from_elf_bytes(path.display().to_string(), &bytes, file_offset)?;
        debug!("{}: {} loadable bytes for '{}'", path.display(), object.memory().len(), target);
        Ok(Self::new(target, object, security))
    }

    pub fn object(&self) -> &BinaryObject {
        &self.object
    }
}

impl Input for ElfInput<'_> {
    fn target_name(&self) -> &TargetName {
        &self.target
    }

    fn image(&self, rng: &mut dyn CryptoRngCore) -> InputResult<Vec<u8>> {
        let (data, start) = self.object.linearize_packed();
        BinaryInput::new(self.target.clone(), data, start, self.security).image(rng)
    }
}
