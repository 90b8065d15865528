//! Pack manifests: the declarative description of a product's targets, key
//! material and the images one build should carry.
//!
//! Manifests are YAML unless the file name ends in `.json`. Key material is
//! hex text; RSA components are given least-significant byte first.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::{FileSystem, FsError};
use crate::pack::PackHeader;
use crate::security::{
    AesCtrSecurity, ImageSecurity, NoSecurity, SecurityError, XteaCbcSecurity, XteaHmacSecurity,
};
use crate::services::InputRequest;
use crate::signer::{
    EcCurve, EcDsaSigner, ImageSigner, RsaKeyComponents, RsaPssSigner, Sha256Signer, SignerError,
};
use crate::targets::{RegistryError, SupportedTargets, TargetKind, TargetOptions};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Fs(#[from] FsError),

    #[error("Failed to parse manifest {path} as {format}: {message}")]
    Parse { path: PathBuf, format: &'static str, message: String },

    #[error("Invalid manifest: {0}")]
    Invalid(String),

    #[error("Invalid hex for {field}: {source}")]
    Hex { field: &'static str, source: hex::FromHexError },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error(transparent)]
    Signer(#[from] SignerError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Json,
}

impl ManifestFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ManifestFormat::Json,
            _ => ManifestFormat::Yaml,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ManifestFormat::Yaml => "YAML",
            ManifestFormat::Json => "JSON",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSection {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSection {
    pub name: String,
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKindSpec {
    Command,
    Hex,
    Elf,
    Bin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub name: String,
    pub kind: TargetKindSpec,
    /// Base address of ELF and binary targets; defaults to 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum SecuritySpec {
    #[default]
    None,
    AesCtr {
        key: String,
    },
    XteaCbc {
        key: String,
    },
    XteaHmac {
        key: String,
        mac_key: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum SignerSpec {
    #[default]
    Sha256,
    EcdsaP224 {
        private_key: String,
        public_key: String,
    },
    EcdsaP256 {
        private_key: String,
        public_key: String,
    },
    RsaPss {
        modulus: String,
        public_exponent: String,
        private_exponent: String,
        prime1: String,
        prime2: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    pub product: ProductSection,
    pub component: ComponentSection,
    pub targets: Vec<TargetSpec>,
    #[serde(default)]
    pub security: SecuritySpec,
    #[serde(default)]
    pub signer: SignerSpec,
    #[serde(default)]
    pub images: Vec<ImageSpec>,
    /// Directory relative image paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn decode_hex(field: &'static str, value: &str) -> ConfigResult<Vec<u8>> {
    hex::decode(value.trim()).map_err(|source| ConfigError::Hex { field, source })
}

impl PackManifest {
    /// Read, parse and validate a manifest file.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> ConfigResult<Self> {
        let bytes = fs.read_bytes(path)?;
        let format = ManifestFormat::from_path(path);
        let mut manifest = Self::parse(&bytes, format).map_err(|err| match err {
            ConfigError::Parse { format, message, .. } => {
                ConfigError::Parse { path: path.to_path_buf(), format, message }
            }
            other => other,
        })?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    /// Parse and validate manifest text; relative image paths stay relative.
    pub fn parse(bytes: &[u8], format: ManifestFormat) -> ConfigResult<Self> {
        let parsed: Result<Self, String> = match format {
            ManifestFormat::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            ManifestFormat::Yaml => serde_yaml::from_slice(bytes).map_err(|e| e.to_string()),
        };
        let manifest = parsed.map_err(|message| ConfigError::Parse {
            path: PathBuf::new(),
            format: format.as_str(),
            message,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.product.name.trim().is_empty() {
            return Err(ConfigError::Invalid("'product.name' is required".into()));
        }
        if self.component.name.trim().is_empty() {
            return Err(ConfigError::Invalid("'component.name' is required".into()));
        }
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("at least one target must be declared".into()));
        }
        for target in &self.targets {
            let takes_offset = matches!(target.kind, TargetKindSpec::Elf | TargetKindSpec::Bin);
            if target.offset.is_some() && !takes_offset {
                return Err(ConfigError::Invalid(format!(
                    "target '{}' cannot have an offset; only elf and bin targets do",
                    target.name
                )));
            }
        }
        Ok(())
    }

    pub fn header(&self) -> PackHeader {
        PackHeader {
            product_name: self.product.name.clone(),
            product_version: self.product.version.clone(),
            component_name: self.component.name.clone(),
            component_version: self.component.version,
        }
    }

    pub fn to_registry(&self) -> ConfigResult<SupportedTargets> {
        let mut builder = SupportedTargets::builder();
        for target in &self.targets {
            let offset = target.offset.unwrap_or(0);
            let kind = match target.kind {
                TargetKindSpec::Command => TargetKind::Command,
                TargetKindSpec::Hex => TargetKind::Hex,
                TargetKindSpec::Elf => TargetKind::Elf { offset },
                TargetKindSpec::Bin => TargetKind::Bin { offset },
            };
            let mut options = TargetOptions::new();
            if target.mandatory {
                options = options.mandatory();
            }
            if let Some(order) = target.order {
                options = options.order(order);
            }
            builder = builder.add(target.name.clone(), kind, options);
        }
        Ok(builder.build()?)
    }

    pub fn to_security(&self) -> ConfigResult<Box<dyn ImageSecurity>> {
        let security: Box<dyn ImageSecurity> = match &self.security {
            SecuritySpec::None => Box::new(NoSecurity),
            SecuritySpec::AesCtr { key } => {
                Box::new(AesCtrSecurity::new(&decode_hex("security.key", key)?)?)
            }
            SecuritySpec::XteaCbc { key } => {
                Box::new(XteaCbcSecurity::new(&decode_hex("security.key", key)?)?)
            }
            SecuritySpec::XteaHmac { key, mac_key } => Box::new(XteaHmacSecurity::new(
                &decode_hex("security.key", key)?,
                &decode_hex("security.mac_key", mac_key)?,
            )?),
        };
        Ok(security)
    }

    pub fn to_signer(&self) -> ConfigResult<Box<dyn ImageSigner>> {
        let signer: Box<dyn ImageSigner> = match &self.signer {
            SignerSpec::Sha256 => Box::new(Sha256Signer),
            SignerSpec::EcdsaP224 { private_key, public_key } => Box::new(EcDsaSigner::new(
                EcCurve::P224,
                &decode_hex("signer.private_key", private_key)?,
                &decode_hex("signer.public_key", public_key)?,
            )?),
            SignerSpec::EcdsaP256 { private_key, public_key } => Box::new(EcDsaSigner::new(
                EcCurve::P256,
                &decode_hex("signer.private_key", private_key)?,
                &decode_hex("signer.public_key", public_key)?,
            )?),
            SignerSpec::RsaPss { modulus, public_exponent, private_exponent, prime1, prime2 } => {
                let modulus = decode_hex("signer.modulus", modulus)?;
                let public_exponent = decode_hex("signer.public_exponent", public_exponent)?;
                let private_exponent = decode_hex("signer.private_exponent", private_exponent)?;
                let prime1 = decode_hex("signer.prime1", prime1)?;
                let prime2 = decode_hex("signer.prime2", prime2)?;
                Box::new(RsaPssSigner::new(RsaKeyComponents {
                    modulus: &modulus,
                    public_exponent: &public_exponent,
                    private_exponent: &private_exponent,
                    prime1: &prime1,
                    prime2: &prime2,
                })?)
            }
        };
        Ok(signer)
    }

    /// Image requests in manifest order with files resolved against `base_dir`.
    pub fn requests(&self) -> Vec<InputRequest> {
        self.images
            .iter()
            .map(|image| InputRequest {
                target: image.target.clone(),
                file: image.file.as_ref().map(|f| {
                    if f.is_absolute() {
                        f.clone()
                    } else {
                        self.base_dir.join(f)
                    }
                }),
                address: image.address,
            })
            .collect()
    }
}
