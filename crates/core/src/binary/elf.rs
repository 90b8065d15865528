use goblin::elf::program_header::{PF_X, PT_LOAD};
use goblin::elf::Elf;
use log::{debug, warn};
use thiserror::Error;

use super::BinaryObject;

/// Section whose bytes replace an executable segment that starts at file
/// offset zero (see `load_elf`).
const ISR_VECTOR_SECTION: &str = ".isr_vector";

#[derive(Debug, Error)]
pub enum ElfError {
    #[error("{file}: not a valid ELF image: {reason}")]
    Malformed { file: String, reason: String },

    #[error("{file}: program header {index} points outside the file")]
    SegmentOutOfBounds { file: String, index: usize },

    #[error("{file}: address 0x{address:08X} was already specified")]
    Overwrite { file: String, address: u32 },

    #[error("{file}: image does not fit below 4 GiB from its load offset")]
    AddressOverflow { file: String },
}

fn file_slice(bytes: &[u8], offset: u64, size: u64) -> Option<&[u8]> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(size).ok()?)?;
    bytes.get(start..end)
}

fn isr_vector<'a>(elf: &Elf, bytes: &'a [u8]) -> Option<&'a [u8]> {
    elf.section_headers
        .iter()
        .find(|sh| elf.shdr_strtab.get_at(sh.sh_name) == Some(ISR_VECTOR_SECTION))
        .and_then(|sh| file_slice(bytes, sh.sh_offset, sh.sh_size))
}

impl BinaryObject {
    /// Copy every loadable, non-empty segment into memory one after another,
    /// starting at `file_offset` rather than the segment's own address.
    ///
    /// Some toolchains emit the vector table in an executable segment whose
    /// file offset is 0, i.e. the segment nominally begins with the ELF header.
    /// For those segments the bytes of the `.isr_vector` section are used
    /// instead. This is a compatibility special case, not a general rule.
    pub(super) fn load_elf(&mut self, bytes: &[u8], file_offset: u32) -> Result<(), ElfError> {
        let elf = Elf::parse(bytes)
            .map_err(|e| ElfError::Malformed { file: self.source.clone(), reason: e.to_string() })?;
        debug!(
            "{}: {}-bit ELF with {} program headers",
            self.source,
            if elf.is_64 { 64 } else { 32 },
            elf.program_headers.len()
        );

        let mut address = u64::from(file_offset);
        for (index, ph) in elf.program_headers.iter().enumerate() {
            if ph.p_type != PT_LOAD || ph.p_filesz == 0 {
                debug!("{}: skipping program header {index}", self.source);
                continue;
            }

            let segment = file_slice(bytes, ph.p_offset, ph.p_filesz).ok_or_else(|| {
                ElfError::SegmentOutOfBounds { file: self.source.clone(), index }
            })?;

            let data = if ph.p_offset == 0 && ph.p_flags & PF_X != 0 {
                match isr_vector(&elf, bytes) {
                    Some(section) => {
                        debug!(
                            "{}: using {ISR_VECTOR_SECTION} for program header {index}",
                            self.source
                        );
                        section
                    }
                    None => {
                        warn!(
                            "{}: program header {index} starts at file offset 0 but there is no \
                             {ISR_VECTOR_SECTION} section; using segment bytes",
                            self.source
                        );
                        segment
                    }
                }
            } else {
                segment
            };

            for byte in data {
                let position = u32::try_from(address)
                    .map_err(|_| ElfError::AddressOverflow { file: self.source.clone() })?;
                self.memory.insert(*byte, position).map_err(|_| ElfError::Overwrite {
                    file: self.source.clone(),
                    address: position,
                })?;
                address += 1;
            }
        }

        debug!("{}: loaded {} bytes", self.source, self.memory.len());
        Ok(())
    }
}
