use rand_core::CryptoRngCore;
use sha2::{Digest, Sha256};

use super::{ImageSigner, SignatureMethod, SignerResult};

/// Integrity-only "signature": the SHA-256 digest of the pack.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Signer;

impl ImageSigner for Sha256Signer {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn method(&self) -> SignatureMethod {
        SignatureMethod::Hash
    }

    fn signature_len(&self) -> usize {
        32
    }

    fn image_signature(&self, pack: &[u8], _rng: &mut dyn CryptoRngCore) -> SignerResult<Vec<u8>> {
        Ok(Sha256::digest(pack).to_vec())
    }

    fn check_signature(&self, signature: &[u8], pack: &[u8]) -> bool {
        Sha256::digest(pack).as_slice() == signature
    }
}
