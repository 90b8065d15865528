use rand_core::CryptoRngCore;
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey};
use sha2::Sha256;

use super::{ImageSigner, SignatureMethod, SignerError, SignerResult};

/// Modulus (and signature) size of the supported 1024-bit keys.
pub const RSA_MODULUS_LEN: usize = 128;

/// Raw RSA key material, every component least-significant byte first.
#[derive(Debug, Clone, Copy)]
pub struct RsaKeyComponents<'a> {
    pub modulus: &'a [u8],
    pub public_exponent: &'a [u8],
    pub private_exponent: &'a [u8],
    pub prime1: &'a [u8],
    pub prime2: &'a [u8],
}

/// RSA-PSS over SHA-256 with a 1024-bit key.
pub struct RsaPssSigner {
    signing: BlindedSigningKey<Sha256>,
    verifying: VerifyingKey<Sha256>,
}

impl std::fmt::Debug for RsaPssSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPssSigner").finish_non_exhaustive()
    }
}

impl RsaPssSigner {
    pub fn new(components: RsaKeyComponents<'_>) -> SignerResult<Self> {
        if components.modulus.len() != RSA_MODULUS_LEN {
            return Err(SignerError::KeyLength {
                what: "RSA modulus",
                expected: RSA_MODULUS_LEN,
                actual: components.modulus.len(),
            });
        }

        // Key material arrives little-endian; BigUint reverses it for us.
        let n = BigUint::from_bytes_le(components.modulus);
        let e = BigUint::from_bytes_le(components.public_exponent);
        let d = BigUint::from_bytes_le(components.private_exponent);
        let primes =
            vec![BigUint::from_bytes_le(components.prime1), BigUint::from_bytes_le(components.prime2)];

        let key = RsaPrivateKey::from_components(n, e, d, primes)
            .map_err(|_| SignerError::InconsistentKeyPair("RSA"))?;
        key.validate().map_err(|_| SignerError::InconsistentKeyPair("RSA"))?;
        if key.size() != RSA_MODULUS_LEN {
            return Err(SignerError::KeyLength {
                what: "RSA modulus",
                expected: RSA_MODULUS_LEN,
                actual: key.size(),
            });
        }

        let verifying = VerifyingKey::<Sha256>::new(key.to_public_key());
        Ok(Self { signing: BlindedSigningKey::<Sha256>::new(key), verifying })
    }
}

impl ImageSigner for RsaPssSigner {
    fn algorithm(&self) -> &'static str {
        "rsa-pss"
    }

    fn method(&self) -> SignatureMethod {
        SignatureMethod::Asymmetric
    }

    fn signature_len(&self) -> usize {
        RSA_MODULUS_LEN
    }

    fn image_signature(&self, pack: &[u8], rng: &mut dyn CryptoRngCore) -> SignerResult<Vec<u8>> {
        let mut rng = rng;
        let signature = self
            .signing
            .try_sign_with_rng(&mut rng, pack)
            .map_err(|e| SignerError::Signing(e.to_string()))?
            .to_vec();
        if signature.len() != RSA_MODULUS_LEN {
            return Err(SignerError::SignatureLength {
                algorithm: self.algorithm(),
                expected: RSA_MODULUS_LEN,
                actual: signature.len(),
            });
        }
        Ok(signature)
    }

    fn check_signature(&self, signature: &[u8], pack: &[u8]) -> bool {
        Signature::try_from(signature)
            .map(|sig| self.verifying.verify(pack, &sig).is_ok())
            .unwrap_or(false)
    }
}
