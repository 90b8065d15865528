use std::path::Path;

use log::debug;
use rand_core::CryptoRngCore;
use zerocopy::byteorder::U32;
use zerocopy::IntoBytes;

use super::{image_block, Input, InputError, InputResult, TargetName};
use crate::io::FileSystem;
use crate::pack::layout::{len_u32, PayloadHeader, PAYLOAD_HEADER_LEN};
use crate::security::ImageSecurity;

/// Raw bytes destined for a fixed address on the device.
pub struct BinaryInput<'a> {
    target: TargetName,
    data: Vec<u8>,
    destination: u32,
    security: &'a dyn ImageSecurity,
}

impl std::fmt::Debug for BinaryInput<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryInput")
            .field("target", &self.target)
            .field("len", &self.data.len())
            .field("destination", &format_args!("0x{:08X}", self.destination))
            .field("security", &self.security.method())
            .finish()
    }
}

impl<'a> BinaryInput<'a> {
    pub fn new(
        target: TargetName,
        data: Vec<u8>,
        destination: u32,
        security: &'a dyn ImageSecurity,
    ) -> Self {
        Self { target, data, destination, security }
    }

    pub fn from_file(
        fs: &dyn FileSystem,
        path: &Path,
        target: TargetName,
        destination: u32,
        security: &'a dyn ImageSecurity,
    ) -> InputResult<Self> {
        let data = fs.read_bytes(path)?;
        debug!(
            "{}: {} bytes for '{}' at 0x{:08X}",
            path.display(),
            data.len(),
            target,
            destination
        );
        Ok(Self::new(target, data, destination, security))
    }

    pub fn destination(&self) -> u32 {
        self.destination
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Plaintext payload before the security transform.
    fn payload(&self) -> InputResult<Vec<u8>> {
        let header = PayloadHeader {
            destination_address: U32::new(self.destination),
            image_size: U32::new(len_u32("image", self.data.len())?),
        };
        let mut payload = Vec::with_capacity(PAYLOAD_HEADER_LEN + self.data.len());
        payload.extend_from_slice(header.as_bytes());
        payload.extend_from_slice(&self.data);
        Ok(payload)
    }
}

impl Input for BinaryInput<'_> {
    fn target_name(&self) -> &TargetName {
        &self.target
    }

    fn image(&self, rng: &mut dyn CryptoRngCore) -> InputResult<Vec<u8>> {
        let secured = self.security.secure(&self.payload()?, rng).map_err(|source| {
            InputError::Security { target: self.target.to_string(), source }
        })?;
        image_block(&self.target, self.security.method(), &secured)
    }
}
