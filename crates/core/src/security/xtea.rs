use hmac::{Hmac, Mac};
use rand_core::{CryptoRngCore, RngCore};
use sha2::Sha256;

use super::{
    check_round_trip, key_array, ImageSecurity, SecurityError, SecurityMethod, SecurityResult,
};

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 16;
const BLOCK_LEN: usize = 8;
const MAC_LEN: usize = 32;
const DELTA: u32 = 0x9E37_79B9;
const CYCLES: u32 = 32;

/// XTEA block cipher, 32 cycles, big-endian word order.
#[derive(Clone)]
struct Xtea {
    key: [u32; 4],
}

impl Xtea {
    fn new(key: &[u8; KEY_LEN]) -> Self {
        let mut words = [0u32; 4];
        for (word, chunk) in words.iter_mut().zip(key.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Self { key: words }
    }

    fn split(block: &[u8; BLOCK_LEN]) -> (u32, u32) {
        (
            u32::from_be_bytes([block[0], block[1], block[2], block[3]]),
            u32::from_be_bytes([block[4], block[5], block[6], block[7]]),
        )
    }

    fn join(v0: u32, v1: u32) -> [u8; BLOCK_LEN] {
        let mut block = [0u8; BLOCK_LEN];
        block[..4].copy_from_slice(&v0.to_be_bytes());
        block[4..].copy_from_slice(&v1.to_be_bytes());
        block
    }

    fn mix(v: u32) -> u32 {
        ((v << 4) ^ (v >> 5)).wrapping_add(v)
    }

    fn encrypt_block(&self, block: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let (mut v0, mut v1) = Self::split(block);
        let mut sum = 0u32;
        for _ in 0..CYCLES {
            v0 = v0.wrapping_add(Self::mix(v1) ^ sum.wrapping_add(self.key[(sum & 3) as usize]));
            sum = sum.wrapping_add(DELTA);
            v1 = v1.wrapping_add(
                Self::mix(v0) ^ sum.wrapping_add(self.key[((sum >> 11) & 3) as usize]),
            );
        }
        Self::join(v0, v1)
    }

    fn decrypt_block(&self, block: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let (mut v0, mut v1) = Self::split(block);
        let mut sum = DELTA.wrapping_mul(CYCLES);
        for _ in 0..CYCLES {
            v1 = v1.wrapping_sub(
                Self::mix(v0) ^ sum.wrapping_add(self.key[((sum >> 11) & 3) as usize]),
            );
            sum = sum.wrapping_sub(DELTA);
            v0 = v0.wrapping_sub(Self::mix(v1) ^ sum.wrapping_add(self.key[(sum & 3) as usize]));
        }
        Self::join(v0, v1)
    }
}

fn xor_block(a: &[u8; BLOCK_LEN], b: &[u8]) -> [u8; BLOCK_LEN] {
    let mut out = *a;
    for (o, x) in out.iter_mut().zip(b) {
        *o ^= x;
    }
    out
}

/// XTEA in CBC mode. The plaintext is zero-padded to a whole number of
/// blocks and the output is `IV || ciphertext`.
#[derive(Clone)]
pub struct XteaCbcSecurity {
    cipher: Xtea,
}

impl std::fmt::Debug for XteaCbcSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XteaCbcSecurity").finish_non_exhaustive()
    }
}

impl XteaCbcSecurity {
    pub fn new(key: &[u8]) -> SecurityResult<Self> {
        Ok(Self { cipher: Xtea::new(&key_array("XTEA key", key)?) })
    }

    fn encrypt(&self, plaintext: &[u8], rng: &mut dyn CryptoRngCore) -> Vec<u8> {
        let mut iv = [0u8; BLOCK_LEN];
        rng.fill_bytes(&mut iv);

        let padded_len = plaintext.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
        let mut padded = plaintext.to_vec();
        padded.resize(padded_len, 0);

        let mut out = Vec::with_capacity(BLOCK_LEN + padded_len);
        out.extend_from_slice(&iv);
        let mut chain = iv;
        for chunk in padded.chunks_exact(BLOCK_LEN) {
            chain = self.cipher.encrypt_block(&xor_block(&chain, chunk));
            out.extend_from_slice(&chain);
        }
        out
    }

    fn decrypt(&self, secured: &[u8]) -> SecurityResult<Vec<u8>> {
        if secured.len() < BLOCK_LEN || secured.len() % BLOCK_LEN != 0 {
            return Err(SecurityError::Malformed("XTEA payload is not a whole number of blocks"));
        }
        let (iv, ciphertext) = secured.split_at(BLOCK_LEN);
        let mut chain: [u8; BLOCK_LEN] = key_array("XTEA IV", iv)?;
        let mut plain = Vec::with_capacity(ciphertext.len());
        for chunk in ciphertext.chunks_exact(BLOCK_LEN) {
            let block: [u8; BLOCK_LEN] = key_array("XTEA block", chunk)?;
            plain.extend_from_slice(&xor_block(&self.cipher.decrypt_block(&block), &chain));
            chain = block;
        }
        Ok(plain)
    }
}

impl ImageSecurity for XteaCbcSecurity {
    fn method(&self) -> SecurityMethod {
        SecurityMethod::XteaCbc
    }

    fn secure(&self, plaintext: &[u8], rng: &mut dyn CryptoRngCore) -> SecurityResult<Vec<u8>> {
        let out = self.encrypt(plaintext, rng);
        check_round_trip("XTEA-CBC", plaintext, &self.decrypt(&out)?)?;
        Ok(out)
    }

    fn open(&self, secured: &[u8]) -> SecurityResult<Vec<u8>> {
        self.decrypt(secured)
    }
}

/// XTEA-CBC followed by HMAC-SHA-256 over `IV || ciphertext`.
/// Output is `MAC || IV || ciphertext`.
#[derive(Clone)]
pub struct XteaHmacSecurity {
    cbc: XteaCbcSecurity,
    mac: HmacSha256,
}

impl std::fmt::Debug for XteaHmacSecurity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XteaHmacSecurity").finish_non_exhaustive()
    }
}

impl XteaHmacSecurity {
    pub fn new(key: &[u8], mac_key: &[u8]) -> SecurityResult<Self> {
        let invalid = SecurityError::KeyLength { what: "HMAC key", expected: MAC_LEN, actual: 0 };
        if mac_key.is_empty() {
            return Err(invalid);
        }
        let mac = HmacSha256::new_from_slice(mac_key).map_err(|_| invalid)?;
        Ok(Self { cbc: XteaCbcSecurity::new(key)?, mac })
    }
}

impl ImageSecurity for XteaHmacSecurity {
    fn method(&self) -> SecurityMethod {
        SecurityMethod::XteaHmac
    }

    fn secure(&self, plaintext: &[u8], rng: &mut dyn CryptoRngCore) -> SecurityResult<Vec<u8>> {
        let ciphertext = self.cbc.encrypt(plaintext, rng);
        let mut mac = self.mac.clone();
        mac.update(&ciphertext);

        let mut out = Vec::with_capacity(MAC_LEN + ciphertext.len());
        out.extend_from_slice(&mac.finalize().into_bytes());
        out.extend_from_slice(&ciphertext);

        check_round_trip("XTEA-HMAC", plaintext, &self.open(&out)?)?;
        Ok(out)
    }

    fn open(&self, secured: &[u8]) -> SecurityResult<Vec<u8>> {
        if secured.len() < MAC_LEN {
            return Err(SecurityError::Malformed("missing HMAC"));
        }
        let (tag, ciphertext) = secured.split_at(MAC_LEN);
        let mut mac = self.mac.clone();
        mac.update(ciphertext);
        mac.verify_slice(tag).map_err(|_| SecurityError::MacMismatch)?;
        self.cbc.decrypt(ciphertext)
    }
}
