//! Per-target inputs and the image blocks they produce.
//!
//! Every block starts with an `ImageHeader` (total size, 8-byte target name,
//! security method). Binary, HEX and ELF inputs follow it with a secured
//! payload of `[destination][size][bytes]`; command inputs carry nothing else.

mod binary;
mod command;
mod mapped;

pub use binary::BinaryInput;
pub use command::CommandInput;
pub use mapped::{ElfInput, HexInput};

use std::fmt;

use rand_core::CryptoRngCore;
use serde::Serialize;
use thiserror::Error;
use zerocopy::byteorder::U32;
use zerocopy::IntoBytes;

use crate::binary::{ElfError, HexError};
use crate::io::FsError;
use crate::pack::layout::{len_u32, ImageHeader, LayoutError, IMAGE_HEADER_LEN, TARGET_NAME_LEN};
use crate::security::{SecurityError, SecurityMethod};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Target name '{name}' is longer than {max} bytes")]
pub struct TargetNameTooLong {
    pub name: String,
    pub max: usize,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error(transparent)]
    TargetName(#[from] TargetNameTooLong),

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Hex(#[from] HexError),

    #[error(transparent)]
    Elf(#[from] ElfError),

    #[error("Securing image for '{target}' failed: {source}")]
    Security { target: String, source: SecurityError },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

pub type InputResult<T> = Result<T, InputError>;

/// Target name that fits the 8-byte field of an image header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TargetName(String);

impl TargetName {
    pub fn new(name: impl Into<String>) -> Result<Self, TargetNameTooLong> {
        let name = name.into();
        if name.len() > TARGET_NAME_LEN {
            return Err(TargetNameTooLong { name, max: TARGET_NAME_LEN });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Zero-padded header field.
    pub fn to_field(&self) -> [u8; TARGET_NAME_LEN] {
        let mut field = [0u8; TARGET_NAME_LEN];
        field[..self.0.len()].copy_from_slice(self.0.as_bytes());
        field
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One component of a pack. `image` may be called repeatedly; each call
/// draws fresh randomness for the security transform.
pub trait Input {
    fn target_name(&self) -> &TargetName;

    fn image(&self, rng: &mut dyn CryptoRngCore) -> InputResult<Vec<u8>>;
}

pub(crate) fn image_block(
    target: &TargetName,
    method: SecurityMethod,
    payload: &[u8],
) -> InputResult<Vec<u8>> {
    let total = IMAGE_HEADER_LEN + payload.len();
    let header = ImageHeader {
        total_size: U32::new(len_u32("image block", total)?),
        target_name: target.to_field(),
        encryption_and_mac_method: U32::new(method.code()),
    };
    let mut block = Vec::with_capacity(total);
    block.extend_from_slice(header.as_bytes());
    block.extend_from_slice(payload);
    Ok(block)
}
