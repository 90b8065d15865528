//! Per-image security transforms.
//!
//! Each strategy turns the plaintext payload of one image block into the
//! bytes that are actually shipped, and can reverse its own output. Every
//! `secure` call opens its result again and compares it to the input before
//! returning; a disagreement means the cipher itself is broken and fails the
//! build.
//!
//! Randomness (IVs, counter blocks) is drawn from the caller's RNG on every
//! call, so securing the same plaintext twice gives different bytes.

mod aes_ctr;
mod xtea;

pub use aes_ctr::AesCtrSecurity;
pub use xtea::{XteaCbcSecurity, XteaHmacSecurity};

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("{what} must be {expected} bytes, got {actual}")]
    KeyLength { what: &'static str, expected: usize, actual: usize },

    #[error("{strategy} self-check failed: decrypted output does not match the plaintext")]
    SelfCheckFailed { strategy: &'static str },

    #[error("Secured payload is malformed: {0}")]
    Malformed(&'static str),

    #[error("Image authentication code does not match")]
    MacMismatch,
}

pub type SecurityResult<T> = Result<T, SecurityError>;

/// Code stored in the `encryptionAndMacMethod` field of an image block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityMethod {
    None,
    AesCtr,
    XteaHmac,
    XteaCbc,
}

impl SecurityMethod {
    pub fn code(self) -> u32 {
        match self {
            SecurityMethod::None => 0,
            SecurityMethod::AesCtr => 1,
            SecurityMethod::XteaHmac => 2,
            SecurityMethod::XteaCbc => 3,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(SecurityMethod::None),
            1 => Some(SecurityMethod::AesCtr),
            2 => Some(SecurityMethod::XteaHmac),
            3 => Some(SecurityMethod::XteaCbc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SecurityMethod::None => "none",
            SecurityMethod::AesCtr => "aes-ctr",
            SecurityMethod::XteaHmac => "xtea-hmac",
            SecurityMethod::XteaCbc => "xtea-cbc",
        }
    }
}

/// Strategy applied to every image payload of a build.
pub trait ImageSecurity {
    fn method(&self) -> SecurityMethod;

    /// Transform `plaintext` into the shipped payload.
    fn secure(&self, plaintext: &[u8], rng: &mut dyn CryptoRngCore) -> SecurityResult<Vec<u8>>;

    /// Inverse of `secure`. Block ciphers return the plaintext with its
    /// zero padding still attached.
    fn open(&self, secured: &[u8]) -> SecurityResult<Vec<u8>>;
}

/// Identity transform.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSecurity;

impl ImageSecurity for NoSecurity {
    fn method(&self) -> SecurityMethod {
        SecurityMethod::None
    }

    fn secure(&self, plaintext: &[u8], _rng: &mut dyn CryptoRngCore) -> SecurityResult<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn open(&self, secured: &[u8]) -> SecurityResult<Vec<u8>> {
        Ok(secured.to_vec())
    }
}

pub(crate) fn key_array<const N: usize>(
    what: &'static str,
    key: &[u8],
) -> SecurityResult<[u8; N]> {
    key.try_into().map_err(|_| SecurityError::KeyLength { what, expected: N, actual: key.len() })
}

/// Post-condition shared by the ciphers: `recovered` is `plaintext`
/// followed only by zero padding.
pub(crate) fn check_round_trip(
    strategy: &'static str,
    plaintext: &[u8],
    recovered: &[u8],
) -> SecurityResult<()> {
    let matches = recovered.len() >= plaintext.len()
        && recovered[..plaintext.len()] == *plaintext
        && recovered[plaintext.len()..].iter().all(|b| *b == 0);
    if matches {
        Ok(())
    } else {
        Err(SecurityError::SelfCheckFailed { strategy })
    }
}
