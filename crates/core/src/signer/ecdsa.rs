use ecdsa::signature::hazmat::{PrehashVerifier, RandomizedPrehashSigner};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{ImageSigner, SignatureMethod, SignerError, SignerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EcCurve {
    P224,
    P256,
}

impl EcCurve {
    /// Size of a private scalar, and of each of R and S.
    pub fn scalar_len(self) -> usize {
        match self {
            EcCurve::P224 => 28,
            EcCurve::P256 => 32,
        }
    }

    pub fn signature_len(self) -> usize {
        2 * self.scalar_len()
    }

    /// Uncompressed SEC1 point: `0x04 || X || Y`.
    pub fn public_key_len(self) -> usize {
        1 + 2 * self.scalar_len()
    }

    pub fn algorithm(self) -> &'static str {
        match self {
            EcCurve::P224 => "ecdsa-p224",
            EcCurve::P256 => "ecdsa-p256",
        }
    }
}

enum CurveKeys {
    P224 { signing: p224::ecdsa::SigningKey, verifying: p224::ecdsa::VerifyingKey },
    P256 { signing: p256::ecdsa::SigningKey, verifying: p256::ecdsa::VerifyingKey },
}

/// EC-DSA over the SHA-256 digest of the pack. Signatures are `R || S`,
/// each the size of the curve order.
pub struct EcDsaSigner {
    curve: EcCurve,
    keys: CurveKeys,
}

impl std::fmt::Debug for EcDsaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcDsaSigner").field("curve", &self.curve).finish_non_exhaustive()
    }
}

fn invalid(what: &'static str, err: impl std::fmt::Display) -> SignerError {
    SignerError::InvalidKey { what, reason: err.to_string() }
}

impl EcDsaSigner {
    /// `private_key` is the big-endian scalar, `public_key` the uncompressed
    /// SEC1 point. The two must form a key pair.
    pub fn new(curve: EcCurve, private_key: &[u8], public_key: &[u8]) -> SignerResult<Self> {
        if private_key.len() != curve.scalar_len() {
            return Err(SignerError::KeyLength {
                what: "EC private key",
                expected: curve.scalar_len(),
                actual: private_key.len(),
            });
        }
        if public_key.len() != curve.public_key_len() {
            return Err(SignerError::KeyLength {
                what: "EC public key",
                expected: curve.public_key_len(),
                actual: public_key.len(),
            });
        }

        let keys = match curve {
            EcCurve::P224 => {
                let signing = p224::ecdsa::SigningKey::from_slice(private_key)
                    .map_err(|e| invalid("P-224 private key", e))?;
                let verifying = p224::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                    .map_err(|e| invalid("P-224 public key", e))?;
                if *signing.verifying_key() != verifying {
                    return Err(SignerError::InconsistentKeyPair("P-224"));
                }
                CurveKeys::P224 { signing, verifying }
            }
            EcCurve::P256 => {
                let signing = p256::ecdsa::SigningKey::from_slice(private_key)
                    .map_err(|e| invalid("P-256 private key", e))?;
                let verifying = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key)
                    .map_err(|e| invalid("P-256 public key", e))?;
                if *signing.verifying_key() != verifying {
                    return Err(SignerError::InconsistentKeyPair("P-256"));
                }
                CurveKeys::P256 { signing, verifying }
            }
        };
        Ok(Self { curve, keys })
    }

    pub fn curve(&self) -> EcCurve {
        self.curve
    }
}

impl ImageSigner for EcDsaSigner {
    fn algorithm(&self) -> &'static str {
        self.curve.algorithm()
    }

    fn method(&self) -> SignatureMethod {
        SignatureMethod::Asymmetric
    }

    fn signature_len(&self) -> usize {
        self.curve.signature_len()
    }

    fn image_signature(&self, pack: &[u8], rng: &mut dyn CryptoRngCore) -> SignerResult<Vec<u8>> {
        let digest = Sha256::digest(pack);
        let mut rng = rng;
        let signature = match &self.keys {
            CurveKeys::P224 { signing, .. } => {
                let signature: p224::ecdsa::Signature = signing
                    .sign_prehash_with_rng(&mut rng, &digest)
                    .map_err(|e| SignerError::Signing(e.to_string()))?;
                signature.to_bytes().to_vec()
            }
            CurveKeys::P256 { signing, .. } => {
                let signature: p256::ecdsa::Signature = signing
                    .sign_prehash_with_rng(&mut rng, &digest)
                    .map_err(|e| SignerError::Signing(e.to_string()))?;
                signature.to_bytes().to_vec()
            }
        };

        if signature.len() != self.signature_len() {
            return Err(SignerError::SignatureLength {
                algorithm: self.algorithm(),
                expected: self.signature_len(),
                actual: signature.len(),
            });
        }
        Ok(signature)
    }

    fn check_signature(&self, signature: &[u8], pack: &[u8]) -> bool {
        let digest = Sha256::digest(pack);
        match &self.keys {
            CurveKeys::P224 { verifying, .. } => p224::ecdsa::Signature::from_slice(signature)
                .map(|sig| verifying.verify_prehash(&digest, &sig).is_ok())
                .unwrap_or(false),
            CurveKeys::P256 { verifying, .. } => p256::ecdsa::Signature::from_slice(signature)
                .map(|sig| verifying.verify_prehash(&digest, &sig).is_ok())
                .unwrap_or(false),
        }
    }
}
