//! Ingestion of Intel-HEX text and ELF images into sparse memory.
//!
//! A `BinaryObject` parses exactly one source into a `SparseVector<u8>`.
//! Callers linearize the result once and then drop the object.

mod elf;
mod hex;

pub use elf::ElfError;
pub use hex::{HexError, HexErrorKind};

use crate::memory::SparseVector;

/// Value used for unmapped bytes when linearizing HEX images.
pub const ERASED_BYTE: u8 = 0xFF;

#[derive(Debug)]
pub struct BinaryObject {
    source: String,
    memory: SparseVector<u8>,
    linear_address: u32,
    end_of_file: bool,
}

impl BinaryObject {
    fn empty(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            memory: SparseVector::new(),
            linear_address: 0,
            end_of_file: false,
        }
    }

    /// Parse Intel-HEX `lines`, placing data records at `file_offset` plus
    /// their record address. `source` names the file in error messages.
    pub fn from_hex_lines<S: AsRef<str>>(
        source: impl Into<String>,
        lines: &[S],
        file_offset: u32,
    ) -> Result<Self, HexError> {
        let mut object = Self::empty(source);
        object.parse_hex(lines, file_offset)?;
        Ok(object)
    }

    /// Load the loadable segments of an ELF image sequentially from `file_offset`.
    pub fn from_elf_bytes(
        source: impl Into<String>,
        bytes: &[u8],
        file_offset: u32,
    ) -> Result<Self, ElfError> {
        let mut object = Self::empty(source);
        object.load_elf(bytes, file_offset)?;
        Ok(object)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn memory(&self) -> &SparseVector<u8> {
        &self.memory
    }

    /// Contiguous image from the lowest to the highest populated address with
    /// gaps set to `fill`, plus its start address.
    pub fn linearize_padded(&self, fill: u8) -> (Vec<u8>, u32) {
        self.memory.to_contiguous(fill)
    }

    /// All populated bytes in address order with gaps dropped, plus the start address.
    pub fn linearize_packed(&self) -> (Vec<u8>, u32) {
        self.memory.to_packed()
    }
}
