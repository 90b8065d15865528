use log::debug;
use thiserror::Error;

use super::BinaryObject;

/// What went wrong with a HEX record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HexErrorKind {
    #[error("invalid checksum")]
    InvalidChecksum,
    #[error("record too short")]
    TooShort,
    #[error("record too long")]
    TooLong,
    #[error("unknown record type 0x{0:02X}")]
    UnknownRecord(u8),
    #[error("end-of-file record missing")]
    MissingEndOfFile,
    #[error("data after end-of-file record")]
    DataAfterEndOfFile,
    #[error("address 0x{0:08X} was already specified")]
    Overwrite(u32),
    #[error("address exceeds the 32-bit range")]
    AddressOverflow,
}

/// HEX parse failure with the file and 1-based line where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{line}: {kind}")]
pub struct HexError {
    pub file: String,
    pub line: usize,
    pub kind: HexErrorKind,
}

const DATA: u8 = 0x00;
const END_OF_FILE: u8 = 0x01;
const EXTENDED_SEGMENT_ADDRESS: u8 = 0x02;
const START_SEGMENT_ADDRESS: u8 = 0x03;
const EXTENDED_LINEAR_ADDRESS: u8 = 0x04;
const START_LINEAR_ADDRESS: u8 = 0x05;

#[derive(Debug, PartialEq, Eq)]
struct Record {
    address: u16,
    record_type: u8,
    data: Vec<u8>,
}

impl Record {
    /// Big-endian 16-bit payload of the extended address records.
    fn address_value(&self) -> Result<u32, HexErrorKind> {
        match self.data.len() {
            2 => Ok(u32::from(u16::from_be_bytes([self.data[0], self.data[1]]))),
            n if n < 2 => Err(HexErrorKind::TooShort),
            _ => Err(HexErrorKind::TooLong),
        }
    }
}

fn nibble(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

/// Decode `:LLAAAATT[DD..]CC`. Anything that cannot be decoded as the
/// announced number of hex pairs is too short; leftover characters are too long.
fn parse_record(text: &str) -> Result<Record, HexErrorKind> {
    let body = text.strip_prefix(':').ok_or(HexErrorKind::TooShort)?.as_bytes();

    let byte_at = |i: usize| -> Result<u8, HexErrorKind> {
        let pair = body.get(2 * i..2 * i + 2).ok_or(HexErrorKind::TooShort)?;
        match (nibble(pair[0]), nibble(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            _ => Err(HexErrorKind::TooShort),
        }
    };

    let count = byte_at(0)? as usize;
    // length, address (2), type, data, checksum
    let total = count + 5;
    if body.len() < 2 * total {
        return Err(HexErrorKind::TooShort);
    }
    if body.len() > 2 * total {
        return Err(HexErrorKind::TooLong);
    }

    let raw = (0..total).map(byte_at).collect::<Result<Vec<u8>, _>>()?;
    if raw.iter().fold(0u8, |sum, b| sum.wrapping_add(*b)) != 0 {
        return Err(HexErrorKind::InvalidChecksum);
    }

    Ok(Record {
        address: u16::from_be_bytes([raw[1], raw[2]]),
        record_type: raw[3],
        data: raw[4..4 + count].to_vec(),
    })
}

impl BinaryObject {
    pub(super) fn parse_hex<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        file_offset: u32,
    ) -> Result<(), HexError> {
        let mut last_line = 0;
        for (index, raw) in lines.iter().enumerate() {
            let line = index + 1;
            last_line = line;
            let text = raw.as_ref().trim();
            if text.is_empty() {
                continue;
            }
            self.apply_hex_line(text, file_offset).map_err(|kind| self.hex_error(line, kind))?;
        }

        if !self.end_of_file {
            return Err(self.hex_error(last_line, HexErrorKind::MissingEndOfFile));
        }
        debug!(
            "{}: {} bytes in {} buckets",
            self.source,
            self.memory.len(),
            self.memory.bucket_count()
        );
        Ok(())
    }

    fn hex_error(&self, line: usize, kind: HexErrorKind) -> HexError {
        HexError { file: self.source.clone(), line, kind }
    }

    fn apply_hex_line(&mut self, text: &str, file_offset: u32) -> Result<(), HexErrorKind> {
        if self.end_of_file {
            return Err(HexErrorKind::DataAfterEndOfFile);
        }

        let record = parse_record(text)?;
        match record.record_type {
            DATA => {
                let base = u64::from(self.linear_address)
                    + u64::from(file_offset)
                    + u64::from(record.address);
                for (i, byte) in record.data.iter().enumerate() {
                    let address = u32::try_from(base + i as u64)
                        .map_err(|_| HexErrorKind::AddressOverflow)?;
                    self.memory
                        .insert(*byte, address)
                        .map_err(|_| HexErrorKind::Overwrite(address))?;
                }
            }
            END_OF_FILE => self.end_of_file = true,
            EXTENDED_SEGMENT_ADDRESS => self.linear_address = record.address_value()? << 4,
            EXTENDED_LINEAR_ADDRESS => self.linear_address = record.address_value()? << 16,
            START_SEGMENT_ADDRESS | START_LINEAR_ADDRESS => {
                debug!("{}: ignoring start address record", self.source);
            }
            other => return Err(HexErrorKind::UnknownRecord(other)),
        }
        Ok(())
    }
}
