//! Whole-pack signature strategies.
//!
//! A signer covers the epilogue and every image block with one signature.
//! EC-DSA and RSA-PSS share `SignatureMethod::Asymmetric` on the wire; the
//! device tells them apart by its configured algorithm and the signature
//! length.

mod ecdsa;
mod hash;
mod rsa_pss;

pub use self::ecdsa::{EcCurve, EcDsaSigner};
pub use self::hash::Sha256Signer;
pub use self::rsa_pss::{RsaKeyComponents, RsaPssSigner, RSA_MODULUS_LEN};

use rand_core::CryptoRngCore;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("{what} must be {expected} bytes, got {actual}")]
    KeyLength { what: &'static str, expected: usize, actual: usize },

    #[error("Invalid {what}: {reason}")]
    InvalidKey { what: &'static str, reason: String },

    #[error("{0} private key does not belong to the supplied public key")]
    InconsistentKeyPair(&'static str),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("{algorithm} produced a {actual}-byte signature, expected {expected}")]
    SignatureLength { algorithm: &'static str, expected: usize, actual: usize },
}

pub type SignerResult<T> = Result<T, SignerError>;

/// Value of the prologue `signatureMethod` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMethod {
    Hash,
    Asymmetric,
}

impl SignatureMethod {
    pub fn code(self) -> u16 {
        match self {
            SignatureMethod::Hash => 0,
            SignatureMethod::Asymmetric => 1,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(SignatureMethod::Hash),
            1 => Some(SignatureMethod::Asymmetric),
            _ => None,
        }
    }
}

pub trait ImageSigner {
    /// Short algorithm name for logs and reports, e.g. `ecdsa-p256`.
    fn algorithm(&self) -> &'static str;

    fn method(&self) -> SignatureMethod;

    /// Length of every signature this signer produces.
    fn signature_len(&self) -> usize;

    fn image_signature(&self, pack: &[u8], rng: &mut dyn CryptoRngCore) -> SignerResult<Vec<u8>>;

    fn check_signature(&self, signature: &[u8], pack: &[u8]) -> bool;
}
