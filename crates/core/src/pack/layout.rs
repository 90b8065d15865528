//! Wire records of an upgrade pack and a read-only decoder for finished packs.
//!
//! ```text
//! [Prologue][signature][Epilogue][Image 0]..[Image N-1]
//!                      \________ signed contents _______/
//! ```
//!
//! All integers are little-endian. The records below are `repr(C)` structs of
//! byte-order-aware fields, so their in-memory layout is the wire layout.

use serde::Serialize;
use thiserror::Error;
use zerocopy::byteorder::{LittleEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::security::SecurityMethod;
use crate::signer::SignerError;

/// "UPPK" when read as little-endian bytes.
pub const PACK_MAGIC: u32 = 0x4B50_5055;
/// Deployment status of a freshly built pack (erased flash).
pub const INITIAL_STATUS: u32 = 0xFFFF_FFFF;
/// `errorCode` sentinel meaning no error has been recorded yet.
pub const NO_ERROR: u32 = 0xFFFF_FFFF;
pub const HEADER_VERSION: u32 = 1;

pub const NAME_FIELD_LEN: usize = 64;
pub const TARGET_NAME_LEN: usize = 8;

pub const PROLOGUE_LEN: usize = core::mem::size_of::<Prologue>();
pub const EPILOGUE_LEN: usize = core::mem::size_of::<Epilogue>();
pub const IMAGE_HEADER_LEN: usize = core::mem::size_of::<ImageHeader>();
pub const PAYLOAD_HEADER_LEN: usize = core::mem::size_of::<PayloadHeader>();

type Le32 = U32<LittleEndian>;
type Le16 = U16<LittleEndian>;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("{field} is {actual} bytes, the field holds at most {max}")]
    FieldTooLong { field: &'static str, max: usize, actual: usize },

    #[error("Pack is truncated: {what} needs {needed} bytes, {available} available")]
    Truncated { what: &'static str, needed: usize, available: usize },

    #[error("Bad pack magic 0x{0:08x}")]
    BadMagic(u32),

    #[error("Unsupported header version {0}")]
    UnsupportedVersion(u32),

    #[error("Header length is {declared}, expected {expected}")]
    HeaderLength { declared: u32, expected: usize },

    #[error("Signed contents length is {declared}, but {actual} bytes follow the signature")]
    SignedLength { declared: u32, actual: usize },

    #[error("Pack declares {declared} images but holds {found}")]
    ImageCount { declared: u32, found: usize },

    #[error("Image {index} has invalid block size {size}")]
    ImageSize { index: usize, size: u32 },

    #[error("{what} of {size} bytes exceeds the {bits}-bit length field")]
    TooLarge { what: &'static str, size: usize, bits: u32 },

    #[error("Signer returned {actual} signature bytes, the header reserves {expected}")]
    SignatureLength { expected: usize, actual: usize },

    #[error("Signature self-check failed with {algorithm}; the pack was not produced")]
    SelfVerifyFailed { algorithm: &'static str },

    #[error(transparent)]
    Signer(#[from] SignerError),
}

pub type LayoutResult<T> = Result<T, LayoutError>;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Prologue {
    pub status: Le32,
    pub magic: Le32,
    pub error_code: Le32,
    pub signed_contents_length: Le32,
    pub signature_method: Le16,
    pub signature_length: Le16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Epilogue {
    pub header_version: Le32,
    pub header_length: Le32,
    pub number_of_images: Le32,
    pub product_name: [u8; NAME_FIELD_LEN],
    pub product_version: [u8; NAME_FIELD_LEN],
    pub component_name: [u8; NAME_FIELD_LEN],
    pub component_version: Le32,
}

/// Leading fields of every image block. `total_size` counts the whole
/// block, this header included.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ImageHeader {
    pub total_size: Le32,
    pub target_name: [u8; TARGET_NAME_LEN],
    pub encryption_and_mac_method: Le32,
}

/// Plaintext prefix of a payload, before the security transform.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PayloadHeader {
    pub destination_address: Le32,
    pub image_size: Le32,
}

/// Zero-padded fixed-width text field.
pub fn fixed_field<const N: usize>(field: &'static str, value: &str) -> LayoutResult<[u8; N]> {
    let bytes = value.as_bytes();
    if bytes.len() > N {
        return Err(LayoutError::FieldTooLong { field, max: N, actual: bytes.len() });
    }
    let mut out = [0u8; N];
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(out)
}

/// Inverse of [`fixed_field`]: text up to the first NUL.
pub fn field_text(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

pub(crate) fn len_u32(what: &'static str, size: usize) -> LayoutResult<u32> {
    u32::try_from(size).map_err(|_| LayoutError::TooLarge { what, size, bits: 32 })
}

fn read_record<'a, T: FromBytes>(
    what: &'static str,
    bytes: &'a [u8],
) -> LayoutResult<(T, &'a [u8])> {
    T::read_from_prefix(bytes).map_err(|_| LayoutError::Truncated {
        what,
        needed: core::mem::size_of::<T>(),
        available: bytes.len(),
    })
}

/// One image block located inside a parsed pack.
#[derive(Debug, Clone)]
pub struct ImageView<'a> {
    pub target_name: String,
    pub method_code: u32,
    pub total_size: u32,
    /// Offset of the block from the start of the pack.
    pub offset: usize,
    /// Secured payload following the image header; empty for commands.
    pub payload: &'a [u8],
}

impl ImageView<'_> {
    pub fn method(&self) -> Option<SecurityMethod> {
        SecurityMethod::from_code(self.method_code)
    }
}

/// Borrowed, validated view of a complete pack.
#[derive(Debug)]
pub struct PackView<'a> {
    prologue: Prologue,
    epilogue: Epilogue,
    signature: &'a [u8],
    signed: &'a [u8],
    images: Vec<ImageView<'a>>,
}

impl<'a> PackView<'a> {
    pub fn parse(bytes: &'a [u8]) -> LayoutResult<Self> {
        let (prologue, rest) = read_record::<Prologue>("prologue", bytes)?;
        if prologue.magic.get() != PACK_MAGIC {
            return Err(LayoutError::BadMagic(prologue.magic.get()));
        }

        let signature_len = usize::from(prologue.signature_length.get());
        if rest.len() < signature_len {
            return Err(LayoutError::Truncated {
                what: "signature",
                needed: signature_len,
                available: rest.len(),
            });
        }
        let (signature, signed) = rest.split_at(signature_len);

        let declared = prologue.signed_contents_length.get();
        if declared as usize != signed.len() {
            return Err(LayoutError::SignedLength { declared, actual: signed.len() });
        }

        let (epilogue, mut remaining) = read_record::<Epilogue>("epilogue", signed)?;
        if epilogue.header_version.get() != HEADER_VERSION {
            return Err(LayoutError::UnsupportedVersion(epilogue.header_version.get()));
        }
        let expected_header = PROLOGUE_LEN + signature_len + EPILOGUE_LEN;
        if epilogue.header_length.get() as usize != expected_header {
            return Err(LayoutError::HeaderLength {
                declared: epilogue.header_length.get(),
                expected: expected_header,
            });
        }

        let mut images = Vec::new();
        let mut offset = expected_header;
        while !remaining.is_empty() {
            let (header, _) = read_record::<ImageHeader>("image header", remaining)?;
            let size = header.total_size.get();
            let block_len = size as usize;
            if block_len < IMAGE_HEADER_LEN || block_len > remaining.len() {
                return Err(LayoutError::ImageSize { index: images.len(), size });
            }
            let (block, next) = remaining.split_at(block_len);
            images.push(ImageView {
                target_name: field_text(&header.target_name),
                method_code: header.encryption_and_mac_method.get(),
                total_size: size,
                offset,
                payload: &block[IMAGE_HEADER_LEN..],
            });
            offset += block_len;
            remaining = next;
        }

        let declared_images = epilogue.number_of_images.get();
        if declared_images as usize != images.len() {
            return Err(LayoutError::ImageCount { declared: declared_images, found: images.len() });
        }

        Ok(Self { prologue, epilogue, signature, signed, images })
    }

    pub fn prologue(&self) -> &Prologue {
        &self.prologue
    }

    pub fn epilogue(&self) -> &Epilogue {
        &self.epilogue
    }

    pub fn signature(&self) -> &'a [u8] {
        self.signature
    }

    /// Epilogue plus every image block: the bytes the signature covers.
    pub fn signed_region(&self) -> &'a [u8] {
        self.signed
    }

    pub fn images(&self) -> &[ImageView<'a>] {
        &self.images
    }

    pub fn summary(&self) -> PackSummary {
        PackSummary {
            status: self.prologue.status.get(),
            error_code: self.prologue.error_code.get(),
            signature_method: self.prologue.signature_method.get(),
            signature_length: self.prologue.signature_length.get(),
            signed_contents_length: self.prologue.signed_contents_length.get(),
            signature: hex::encode(self.signature),
            header_version: self.epilogue.header_version.get(),
            header_length: self.epilogue.header_length.get(),
            product_name: field_text(&self.epilogue.product_name),
            product_version: field_text(&self.epilogue.product_version),
            component_name: field_text(&self.epilogue.component_name),
            component_version: self.epilogue.component_version.get(),
            images: self
                .images
                .iter()
                .map(|image| ImageSummary {
                    target: image.target_name.clone(),
                    method: image
                        .method()
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_else(|| format!("unknown({})", image.method_code)),
                    total_size: image.total_size,
                    offset: image.offset,
                    payload_len: image.payload.len(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    pub target: String,
    pub method: String,
    pub total_size: u32,
    pub offset: usize,
    pub payload_len: usize,
}

/// Serializable description of a pack, as printed by `inspect --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackSummary {
    pub status: u32,
    pub error_code: u32,
    pub signature_method: u16,
    pub signature_length: u16,
    pub signed_contents_length: u32,
    pub signature: String,
    pub header_version: u32,
    pub header_length: u32,
    pub product_name: String,
    pub product_version: String,
    pub component_name: String,
    pub component_version: u32,
    pub images: Vec<ImageSummary>,
}
