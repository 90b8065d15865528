use std::path::Path;

use pack_core::input::{Input, TargetNameTooLong};
use pack_core::io::MemoryFileSystem;
use pack_core::security::NoSecurity;
use pack_core::targets::{
    FactoryError, InputFactory, RegistryError, SupportedTargets, TargetKind, TargetOptions,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn registry() -> SupportedTargets {
    SupportedTargets::builder()
        .add_bin("boot", 0x0800_0000, TargetOptions::new().mandatory().order(1))
        .add_hex("app", TargetOptions::new().order(2))
        .add_elf("radio", 0x0010_0000, TargetOptions::new().order(2))
        .add_command("reset", TargetOptions::new())
        .add_bin("cfg", 0x0807_F800, TargetOptions::new())
        .build()
        .expect("valid registry")
}

#[test]
fn lookups_reflect_declarations() {
    let targets = registry();
    assert_eq!(targets.len(), 5);
    assert_eq!(targets.kind_of("radio"), Some(TargetKind::Elf { offset: 0x0010_0000 }));
    assert_eq!(targets.kind_of("reset"), Some(TargetKind::Command));
    assert_eq!(targets.kind_of("nope"), None);
    assert_eq!(targets.order_of("app"), Some(2));
    assert_eq!(targets.order_of("cfg"), None);
    assert_eq!(targets.names().collect::<Vec<_>>(), vec!["boot", "app", "radio", "reset", "cfg"]);
}

#[test]
fn mandatory_flag_applies_only_to_its_target() {
    let targets = registry();
    assert_eq!(targets.mandatory_targets().into_iter().collect::<Vec<_>>(), vec!["boot"]);
    assert!(!targets.get("app").unwrap().mandatory);
    assert!(!targets.get("cfg").unwrap().mandatory);
}

#[test]
fn order_map_groups_equal_keys() {
    let targets = registry();
    let map = targets.order_map();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&1].iter().copied().collect::<Vec<_>>(), vec!["boot"]);
    assert_eq!(map[&2].iter().copied().collect::<Vec<_>>(), vec!["app", "radio"]);
}

#[test]
fn selection_accepts_unordered_targets_anywhere() {
    let targets = registry();
    targets.check_selection(["reset", "boot", "cfg", "radio", "app"]).unwrap();
    targets.check_selection(["boot"]).unwrap();
}

#[test]
fn selection_without_mandatory_target_fails() {
    let err = registry().check_selection(["app", "reset"]).unwrap_err();
    assert_eq!(err, RegistryError::MissingTarget("boot".into()));
}

#[test]
fn selection_out_of_order_fails() {
    let err = registry().check_selection(["app", "boot"]).unwrap_err();
    assert_eq!(
        err,
        RegistryError::OrderViolation {
            target: "boot".into(),
            order: 1,
            previous: "app".into(),
            previous_order: 2,
        }
    );
}

#[test]
fn selection_rejects_unknown_and_repeated_targets() {
    let targets = registry();
    assert_eq!(
        targets.check_selection(["boot", "modem"]).unwrap_err(),
        RegistryError::UnknownTarget("modem".into())
    );
    assert_eq!(
        targets.check_selection(["boot", "reset", "reset"]).unwrap_err(),
        RegistryError::DuplicateRequest("reset".into())
    );
}

#[test]
fn builder_rejects_duplicates_and_long_names() {
    let err = SupportedTargets::builder()
        .add_command("reset", TargetOptions::new())
        .add_hex("reset", TargetOptions::new())
        .build()
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateTarget("reset".into()));

    let err = SupportedTargets::builder()
        .add_hex("bootloader", TargetOptions::new())
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::TargetName(TargetNameTooLong { name: "bootloader".into(), max: 8 })
    );
}

#[test]
fn factory_dispatches_on_target_kind() {
    let targets = registry();
    let fs = MemoryFileSystem::new();
    fs.insert("boot.bin", vec![0xAA, 0xBB]);
    fs.insert("app.hex", b":0100000001fe\n:00000001FF\n".to_vec());
    let security = NoSecurity;
    let factory = InputFactory::new(&targets, &security, &fs);
    let mut rng = StdRng::seed_from_u64(0);

    let boot = factory.create_input("boot", Some(Path::new("boot.bin")), None).unwrap();
    assert_eq!(boot.target_name().as_str(), "boot");
    let block = boot.image(&mut rng).unwrap();
    assert_eq!(&block[16..20], &0x0800_0000u32.to_le_bytes());
    assert_eq!(&block[24..], &[0xAA, 0xBB]);

    let app = factory.create_input("app", Some(Path::new("app.hex")), Some(0x100)).unwrap();
    let block = app.image(&mut rng).unwrap();
    assert_eq!(&block[16..20], &0x100u32.to_le_bytes());
    assert_eq!(&block[24..], &[0x01]);

    let reset = factory.create_input("reset", Some(Path::new("ignored")), Some(7)).unwrap();
    assert_eq!(reset.image(&mut rng).unwrap().len(), 16);
}

#[test]
fn factory_address_overrides_registry_offset() {
    let targets = registry();
    let fs = MemoryFileSystem::new();
    fs.insert("cfg.bin", vec![1]);
    let security = NoSecurity;
    let factory = InputFactory::new(&targets, &security, &fs);
    let mut rng = StdRng::seed_from_u64(0);

    let cfg = factory.create_input("cfg", Some(Path::new("cfg.bin")), Some(0x2000_0000)).unwrap();
    let block = cfg.image(&mut rng).unwrap();
    assert_eq!(&block[16..20], &0x2000_0000u32.to_le_bytes());
}

#[test]
fn factory_reports_unknown_targets_and_missing_files() {
    let targets = registry();
    let fs = MemoryFileSystem::new();
    let security = NoSecurity;
    let factory = InputFactory::new(&targets, &security, &fs);

    let err = factory.create_input("modem", None, None).err().unwrap();
    assert!(matches!(
        err,
        FactoryError::Registry(RegistryError::UnknownTarget(ref t)) if t == "modem"
    ));

    let err = factory.create_input("boot", None, None).err().unwrap();
    assert!(matches!(err, FactoryError::MissingFile(ref t) if t == "boot"));

    let err = factory.create_input("boot", Some(Path::new("absent.bin")), None).err().unwrap();
    assert!(matches!(err, FactoryError::Input(_)));
}
