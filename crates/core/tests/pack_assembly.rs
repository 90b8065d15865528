use std::path::Path;

use pack_core::io::{FileSystem, MemoryFileSystem, StdFileSystem};
use pack_core::pack::layout::{EPILOGUE_LEN, INITIAL_STATUS, NO_ERROR, PACK_MAGIC, PROLOGUE_LEN};
use pack_core::pack::{PackHeader, PackView};
use pack_core::security::{ImageSecurity, NoSecurity, SecurityMethod, XteaHmacSecurity};
use pack_core::services::{BuildContext, BuildError, InputRequest};
use pack_core::signer::{ImageSigner, Sha256Signer};
use pack_core::targets::{RegistryError, SupportedTargets, TargetOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn header() -> PackHeader {
    PackHeader {
        product_name: "sensor-node".into(),
        product_version: "2.4.0".into(),
        component_name: "main-mcu".into(),
        component_version: 0x0002_0400,
    }
}

fn registry() -> SupportedTargets {
    SupportedTargets::builder()
        .add_bin("boot", 0x0800_0000, TargetOptions::new().order(1))
        .add_hex("app", TargetOptions::new().order(2))
        .add_command("reset", TargetOptions::new())
        .build()
        .unwrap()
}

fn context<'a>(
    registry: &'a SupportedTargets,
    header: &'a PackHeader,
    security: &'a dyn ImageSecurity,
    signer: &'a dyn ImageSigner,
    fs: &'a dyn FileSystem,
) -> BuildContext<'a> {
    BuildContext { registry, header, security, signer, fs }
}

#[test]
fn empty_pack_is_prologue_signature_and_epilogue() {
    let (registry, header) = (registry(), header());
    let fs = MemoryFileSystem::new();
    let ctx = context(&registry, &header, &NoSecurity, &Sha256Signer, &fs);
    let mut rng = StdRng::seed_from_u64(1);

    let outcome = ctx.build(&[], &mut rng).unwrap();
    let bytes = outcome.pack.as_bytes();
    assert_eq!(bytes.len(), PROLOGUE_LEN + 32 + EPILOGUE_LEN);

    let view = PackView::parse(bytes).unwrap();
    assert_eq!(view.prologue().status.get(), INITIAL_STATUS);
    assert_eq!(view.prologue().magic.get(), PACK_MAGIC);
    assert_eq!(view.prologue().error_code.get(), NO_ERROR);
    assert_eq!(view.prologue().signed_contents_length.get(), 208);
    assert_eq!(view.epilogue().number_of_images.get(), 0);
    assert_eq!(view.epilogue().header_length.get(), 20 + 32 + 208);
    assert!(view.images().is_empty());
}

#[test]
fn binary_block_under_no_security_is_header_payload_header_and_data() {
    let (registry, header) = (registry(), header());
    let fs = MemoryFileSystem::new();
    fs.insert("boot.bin", vec![1, 2, 3, 4]);
    let ctx = context(&registry, &header, &NoSecurity, &Sha256Signer, &fs);
    let mut rng = StdRng::seed_from_u64(2);

    let outcome = ctx.build(&[InputRequest::file("boot", "boot.bin")], &mut rng).unwrap();
    assert_eq!(outcome.images.len(), 1);
    assert_eq!(outcome.images[0].block_len, 28);
    assert_eq!(outcome.images[0].kind, "bin");

    let bytes = outcome.pack.as_bytes();
    let view = PackView::parse(bytes).unwrap();
    let image = &view.images()[0];
    assert_eq!(image.target_name, "boot");
    assert_eq!(image.total_size, 28);
    assert_eq!(image.method(), Some(SecurityMethod::None));
    assert_eq!(image.offset, PROLOGUE_LEN + 32 + EPILOGUE_LEN);
    assert_eq!(image.payload, &[0x00, 0x00, 0x00, 0x08, 4, 0, 0, 0, 1, 2, 3, 4]);
}

#[test]
fn hash_signature_covers_epilogue_and_images() {
    let (registry, header) = (registry(), header());
    let fs = MemoryFileSystem::new();
    fs.insert("boot.bin", vec![0xA5; 100]);
    fs.insert("app.hex", b":04000000DEADBEEFC4\n:00000001FF\n".to_vec());
    let ctx = context(&registry, &header, &NoSecurity, &Sha256Signer, &fs);
    let mut rng = StdRng::seed_from_u64(3);

    let requests = [
        InputRequest::file("boot", "boot.bin"),
        InputRequest::command("reset"),
        InputRequest::file("app", "app.hex").at(0x0800_4000),
    ];
    let outcome = ctx.build(&requests, &mut rng).unwrap();
    let pack = &outcome.pack;

    assert_eq!(pack.signature(), Sha256::digest(pack.signed_region()).as_slice());
    assert_eq!(pack.signed_region().len(), 208 + (16 + 8 + 100) + 16 + (16 + 8 + 4));

    let view = PackView::parse(pack.as_bytes()).unwrap();
    let names: Vec<&str> = view.images().iter().map(|i| i.target_name.as_str()).collect();
    assert_eq!(names, vec!["boot", "reset", "app"]);
    assert!(view.images()[1].payload.is_empty());

    let summary = view.summary();
    assert_eq!(summary.product_name, "sensor-node");
    assert_eq!(summary.component_name, "main-mcu");
    assert_eq!(summary.component_version, 0x0002_0400);
    assert_eq!(summary.signature_method, 0);
    assert_eq!(summary.signature, hex::encode(pack.signature()));
}

#[test]
fn secured_payloads_open_with_the_same_strategy() {
    let (registry, header) = (registry(), header());
    let fs = MemoryFileSystem::new();
    fs.insert("boot.bin", vec![9u8; 13]);
    let security = XteaHmacSecurity::new(b"0123456789abcdef", b"mac").unwrap();
    let ctx = context(&registry, &header, &security, &Sha256Signer, &fs);
    let mut rng = StdRng::seed_from_u64(4);

    let outcome = ctx.build(&[InputRequest::file("boot", "boot.bin")], &mut rng).unwrap();
    assert_eq!(outcome.security, "xtea-hmac");
    let view = PackView::parse(outcome.pack.as_bytes()).unwrap();
    let image = &view.images()[0];
    assert_eq!(image.method(), Some(SecurityMethod::XteaHmac));

    let opened = security.open(image.payload).unwrap();
    assert_eq!(&opened[..4], &0x0800_0000u32.to_le_bytes());
    assert_eq!(&opened[4..8], &13u32.to_le_bytes());
    assert_eq!(&opened[8..21], &[9u8; 13]);
}

#[test]
fn build_to_file_writes_the_signed_pack() {
    let (registry, header) = (registry(), header());
    let fs = MemoryFileSystem::new();
    fs.insert("boot.bin", vec![1, 2, 3]);
    let ctx = context(&registry, &header, &NoSecurity, &Sha256Signer, &fs);
    let mut rng = StdRng::seed_from_u64(5);

    let outcome = ctx
        .build_to_file(&[InputRequest::file("boot", "boot.bin")], Path::new("out.pack"), &mut rng)
        .unwrap();
    assert_eq!(fs.get("out.pack").unwrap(), outcome.pack.as_bytes());
}

#[test]
fn failed_build_writes_nothing() {
    let registry = SupportedTargets::builder()
        .add_bin("boot", 0, TargetOptions::new().mandatory())
        .add_command("reset", TargetOptions::new())
        .build()
        .unwrap();
    let header = header();
    let fs = MemoryFileSystem::new();
    let ctx = context(&registry, &header, &NoSecurity, &Sha256Signer, &fs);
    let mut rng = StdRng::seed_from_u64(6);

    let err = ctx
        .build_to_file(&[InputRequest::command("reset")], Path::new("out.pack"), &mut rng)
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::Registry(RegistryError::MissingTarget(ref t)) if t == "boot"
    ));
    assert!(!fs.contains("out.pack"));

    let err = ctx
        .build_to_file(&[InputRequest::file("boot", "absent.bin")], Path::new("out.pack"), &mut rng)
        .unwrap_err();
    assert!(matches!(err, BuildError::Factory(_)));
    assert!(!fs.contains("out.pack"));
}

#[test]
fn builds_against_the_host_file_system() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("boot.bin");
    let output = dir.path().join("fw.pack");
    std::fs::write(&input, [0xEEu8; 32]).unwrap();

    let (registry, header) = (registry(), header());
    let ctx = context(&registry, &header, &NoSecurity, &Sha256Signer, &StdFileSystem);
    let mut rng = StdRng::seed_from_u64(7);

    let outcome =
        ctx.build_to_file(&[InputRequest::file("boot", &input)], &output, &mut rng).unwrap();
    let written = std::fs::read(&output).unwrap();
    assert_eq!(written, outcome.pack.as_bytes());
    assert!(!dir.path().join("fw.pack.part").exists());
    PackView::parse(&written).unwrap();
}

#[test]
fn truncated_pack_does_not_parse() {
    let (registry, header) = (registry(), header());
    let fs = MemoryFileSystem::new();
    let ctx = context(&registry, &header, &NoSecurity, &Sha256Signer, &fs);
    let mut rng = StdRng::seed_from_u64(8);
    let outcome = ctx.build(&[InputRequest::command("reset")], &mut rng).unwrap();

    let bytes = outcome.pack.as_bytes();
    assert!(PackView::parse(&bytes[..bytes.len() - 1]).is_err());
}
