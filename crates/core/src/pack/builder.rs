use log::{debug, info};
use rand_core::CryptoRngCore;
use zerocopy::byteorder::{U16, U32};
use zerocopy::IntoBytes;

use super::layout::{
    fixed_field, len_u32, Epilogue, LayoutError, LayoutResult, Prologue, EPILOGUE_LEN,
    HEADER_VERSION, INITIAL_STATUS, NO_ERROR, PACK_MAGIC, PROLOGUE_LEN,
};
use crate::signer::ImageSigner;

/// Identification written into the epilogue of every pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackHeader {
    pub product_name: String,
    pub product_version: String,
    pub component_name: String,
    pub component_version: u32,
}

/// Assembles one pack: epilogue first, then image blocks in request order,
/// then the signature and prologue in front.
///
/// `sign` consumes the builder, so a pack can only be signed once and the
/// unsigned buffer never escapes.
#[derive(Debug)]
pub struct UpgradePackBuilder {
    body: Vec<u8>,
    declared_images: usize,
    appended: usize,
    signature_len: u16,
}

impl UpgradePackBuilder {
    pub fn new(
        header: &PackHeader,
        image_count: usize,
        signature_len: usize,
    ) -> LayoutResult<Self> {
        let signature_len = u16::try_from(signature_len).map_err(|_| LayoutError::TooLarge {
            what: "signature",
            size: signature_len,
            bits: 16,
        })?;
        let header_length = PROLOGUE_LEN + usize::from(signature_len) + EPILOGUE_LEN;

        let epilogue = Epilogue {
            header_version: U32::new(HEADER_VERSION),
            header_length: U32::new(len_u32("header", header_length)?),
            number_of_images: U32::new(len_u32("image count", image_count)?),
            product_name: fixed_field("product name", &header.product_name)?,
            product_version: fixed_field("product version", &header.product_version)?,
            component_name: fixed_field("component name", &header.component_name)?,
            component_version: U32::new(header.component_version),
        };

        Ok(Self {
            body: epilogue.as_bytes().to_vec(),
            declared_images: image_count,
            appended: 0,
            signature_len,
        })
    }

    pub fn append_image(&mut self, block: &[u8]) -> LayoutResult<()> {
        if self.appended == self.declared_images {
            return Err(LayoutError::ImageCount {
                declared: len_u32("image count", self.declared_images)?,
                found: self.appended + 1,
            });
        }
        debug!(
            "image {} appended at signed offset {} ({} bytes)",
            self.appended,
            self.body.len(),
            block.len()
        );
        self.body.extend_from_slice(block);
        self.appended += 1;
        Ok(())
    }

    /// Bytes the signature will cover so far.
    pub fn signed_len(&self) -> usize {
        self.body.len()
    }

    /// Sign the epilogue and images, prepend prologue and signature, then
    /// check the signature against the finished bytes.
    pub fn sign(
        self,
        signer: &dyn ImageSigner,
        rng: &mut dyn CryptoRngCore,
    ) -> LayoutResult<UpgradePack> {
        if self.appended != self.declared_images {
            return Err(LayoutError::ImageCount {
                declared: len_u32("image count", self.declared_images)?,
                found: self.appended,
            });
        }

        let expected = usize::from(self.signature_len);
        let signature = signer.image_signature(&self.body, rng)?;
        if signature.len() != expected {
            return Err(LayoutError::SignatureLength { expected, actual: signature.len() });
        }

        let prologue = Prologue {
            status: U32::new(INITIAL_STATUS),
            magic: U32::new(PACK_MAGIC),
            error_code: U32::new(NO_ERROR),
            signed_contents_length: U32::new(len_u32("signed contents", self.body.len())?),
            signature_method: U16::new(signer.method().code()),
            signature_length: U16::new(self.signature_len),
        };

        let mut bytes = Vec::with_capacity(PROLOGUE_LEN + expected + self.body.len());
        bytes.extend_from_slice(prologue.as_bytes());
        bytes.extend_from_slice(&signature);
        bytes.extend_from_slice(&self.body);

        let pack = UpgradePack { bytes, signature_len: expected };
        if !signer.check_signature(pack.signature(), pack.signed_region()) {
            return Err(LayoutError::SelfVerifyFailed { algorithm: signer.algorithm() });
        }
        info!(
            "pack signed with {} ({} images, {} bytes)",
            signer.algorithm(),
            self.appended,
            pack.len()
        );
        Ok(pack)
    }
}

/// A signed and self-verified pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePack {
    bytes: Vec<u8>,
    signature_len: usize,
}

impl UpgradePack {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn signature(&self) -> &[u8] {
        &self.bytes[PROLOGUE_LEN..PROLOGUE_LEN + self.signature_len]
    }

    pub fn signed_region(&self) -> &[u8] {
        &self.bytes[PROLOGUE_LEN + self.signature_len..]
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::signer::{SignatureMethod, SignerResult};

    fn header() -> PackHeader {
        PackHeader {
            product_name: "widget".into(),
            product_version: "1.2".into(),
            component_name: "main".into(),
            component_version: 7,
        }
    }

    /// Signer whose verification always disagrees with its signing.
    struct Lopsided;

    impl ImageSigner for Lopsided {
        fn algorithm(&self) -> &'static str {
            "lopsided"
        }
        fn method(&self) -> SignatureMethod {
            SignatureMethod::Hash
        }
        fn signature_len(&self) -> usize {
            4
        }
        fn image_signature(&self, _: &[u8], _: &mut dyn CryptoRngCore) -> SignerResult<Vec<u8>> {
            Ok(vec![1, 2, 3, 4])
        }
        fn check_signature(&self, _: &[u8], _: &[u8]) -> bool {
            false
        }
    }

    #[test]
    fn self_verification_failure_is_fatal() {
        let builder = UpgradePackBuilder::new(&header(), 0, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = builder.sign(&Lopsided, &mut rng).unwrap_err();
        assert!(matches!(err, LayoutError::SelfVerifyFailed { algorithm: "lopsided" }));
    }

    #[test]
    fn image_count_must_match_declaration() {
        let mut builder = UpgradePackBuilder::new(&header(), 1, 4).unwrap();
        builder.append_image(&[0u8; 16]).unwrap();
        assert!(matches!(
            builder.append_image(&[0u8; 16]),
            Err(LayoutError::ImageCount { declared: 1, found: 2 })
        ));

        let short = UpgradePackBuilder::new(&header(), 2, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            short.sign(&Lopsided, &mut rng),
            Err(LayoutError::ImageCount { declared: 2, found: 0 })
        ));
    }

    #[test]
    fn long_product_name_is_rejected() {
        let mut long = header();
        long.product_name = "p".repeat(65);
        assert!(matches!(
            UpgradePackBuilder::new(&long, 0, 32),
            Err(LayoutError::FieldTooLong { field: "product name", .. })
        ));
    }
}
