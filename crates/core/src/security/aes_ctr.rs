use ctr::cipher::{KeyIvInit, StreamCipher};
use rand_core::{CryptoRngCore, RngCore};

use super::{
    check_round_trip, key_array, ImageSecurity, SecurityError, SecurityMethod, SecurityResult,
};

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

const KEY_LEN: usize = 16;
const COUNTER_LEN: usize = 16;

/// AES-128 in counter mode. Output is `counter block || ciphertext`.
#[derive(Clone)]
pub struct AesCtrSecurity {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for AesCtrSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesCtrSecurity").finish_non_exhaustive()
    }
}

impl AesCtrSecurity {
    pub fn new(key: &[u8]) -> SecurityResult<Self> {
        Ok(Self { key: key_array("AES-128 key", key)? })
    }

    fn apply(&self, counter: &[u8; COUNTER_LEN], buf: &mut [u8]) {
        let mut cipher = Aes128Ctr::new(&self.key.into(), &(*counter).into());
        cipher.apply_keystream(buf);
    }
}

impl ImageSecurity for AesCtrSecurity {
    fn method(&self) -> SecurityMethod {
        SecurityMethod::AesCtr
    }

    fn secure(&self, plaintext: &[u8], rng: &mut dyn CryptoRngCore) -> SecurityResult<Vec<u8>> {
        let mut counter = [0u8; COUNTER_LEN];
        rng.fill_bytes(&mut counter);

        let mut out = Vec::with_capacity(COUNTER_LEN + plaintext.len());
        out.extend_from_slice(&counter);
        out.extend_from_slice(plaintext);
        self.apply(&counter, &mut out[COUNTER_LEN..]);

        check_round_trip("AES-CTR", plaintext, &self.open(&out)?)?;
        Ok(out)
    }

    fn open(&self, secured: &[u8]) -> SecurityResult<Vec<u8>> {
        if secured.len() < COUNTER_LEN {
            return Err(SecurityError::Malformed("missing AES counter block"));
        }
        let (counter, ciphertext) = secured.split_at(COUNTER_LEN);
        let counter: [u8; COUNTER_LEN] = key_array("AES counter block", counter)?;
        let mut plain = ciphertext.to_vec();
        self.apply(&counter, &mut plain);
        Ok(plain)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn rejects_short_key() {
        let err = AesCtrSecurity::new(&[0u8; 15]).unwrap_err();
        assert_eq!(err, SecurityError::KeyLength { what: "AES-128 key", expected: 16, actual: 15 });
    }

    #[test]
    fn matches_nist_ctr_vector() {
        // NIST SP 800-38A F.5.1, first block.
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let counter: [u8; 16] =
            hex::decode("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff").unwrap().try_into().unwrap();
        let mut block = hex::decode("6bc1bee22e409f96e93d7e117393172a").unwrap();
        AesCtrSecurity::new(&key).unwrap().apply(&counter, &mut block);
        assert_eq!(hex::encode(block), "874d6191b620e3261bef6864990db6ce");
    }

    #[test]
    fn prepends_counter_block() {
        let security = AesCtrSecurity::new(&[7u8; 16]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let secured = security.secure(b"firmware", &mut rng).unwrap();
        assert_eq!(secured.len(), 16 + 8);
        assert_eq!(security.open(&secured).unwrap(), b"firmware");
    }
}
