use std::fs;
use std::path::{Path, PathBuf};

use predicates::prelude::*;
use tempfile::{tempdir, TempDir};
use upgrade_pack::commands::BuildReport;
use upgrade_pack::sha256_bytes;

const MANIFEST: &str = r#"
product: { name: sensor-node, version: "1.2.0" }
component: { name: main-mcu, version: 3 }
targets:
  - { name: boot, kind: bin, offset: 0x08000000, mandatory: true, order: 1 }
  - { name: app, kind: hex, order: 2 }
  - { name: reset, kind: command }
security:
  method: xtea-hmac
  key: "000102030405060708090a0b0c0d0e0f"
  mac_key: "6d61632d6b6579"
images:
  - { target: boot, file: boot.bin }
  - { target: app, file: app.hex, address: 0x08004000 }
  - { target: reset }
"#;

/// Temp directory holding a manifest plus the image files it references.
fn workspace(manifest: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("boot.bin"), [0x5Au8; 16]).expect("write boot.bin");
    fs::write(dir.path().join("app.hex"), ":04000000DEADBEEFC4\n:00000001FF\n")
        .expect("write app.hex");
    let manifest_path = dir.path().join("pack.yaml");
    fs::write(&manifest_path, manifest).expect("write manifest");
    (dir, manifest_path)
}

fn build(manifest: &Path, output: &Path) -> assert_cmd::assert::Assert {
    assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("build")
        .arg("--manifest")
        .arg(manifest)
        .arg("--output")
        .arg(output)
        .assert()
}

#[test]
fn build_writes_pack_and_report() {
    let (dir, manifest) = workspace(MANIFEST);
    let output = dir.path().join("fw.pack");
    let report = dir.path().join("report.json");

    assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("build")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--output")
        .arg(&output)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("Built upgrade pack:"))
        .stdout(predicate::str::contains("- boot (bin, 80 bytes)"))
        .stdout(predicate::str::contains("- reset (command, 16 bytes)"));

    let pack = fs::read(&output).expect("pack written");
    // 20 prologue + 32 signature + 208 epilogue + 80 boot + 72 app + 16 reset
    assert_eq!(pack.len(), 428);

    let report: BuildReport =
        serde_json::from_str(&fs::read_to_string(&report).expect("report written"))
            .expect("report json");
    assert_eq!(report.pack_size, 428);
    assert_eq!(report.pack_sha256, sha256_bytes(&pack));
    assert_eq!(report.security, "xtea-hmac");
    assert_eq!(report.signer, "sha256");
    assert_eq!(report.signature_length, 32);
    let targets: Vec<&str> = report.images.iter().map(|i| i.target.as_str()).collect();
    assert_eq!(targets, vec!["boot", "app", "reset"]);
}

#[test]
fn build_fails_without_mandatory_target_and_writes_nothing() {
    let manifest_text = MANIFEST.replace("  - { target: boot, file: boot.bin }\n", "");
    let (dir, manifest) = workspace(&manifest_text);
    let output = dir.path().join("fw.pack");

    build(&manifest, &output)
        .failure()
        .stderr(predicate::str::contains("Mandatory target 'boot' was not supplied"));
    assert!(!output.exists());
}

#[test]
fn build_fails_for_out_of_order_images() {
    let manifest_text = MANIFEST.replace(
        "  - { target: boot, file: boot.bin }\n  - { target: app, file: app.hex, address: 0x08004000 }\n",
        "  - { target: app, file: app.hex }\n  - { target: boot, file: boot.bin }\n",
    );
    let (dir, manifest) = workspace(&manifest_text);
    let output = dir.path().join("fw.pack");

    build(&manifest, &output).failure().stderr(predicate::str::contains("must not follow"));
    assert!(!output.exists());
}

#[test]
fn build_fails_for_missing_manifest() {
    let dir = tempdir().expect("tempdir");
    build(&dir.path().join("absent.yaml"), &dir.path().join("fw.pack"))
        .failure()
        .stderr(predicate::str::contains("Failed to load pack manifest"));
}

#[test]
fn inspect_json_describes_layout() {
    let (dir, manifest) = workspace(MANIFEST);
    let output = dir.path().join("fw.pack");
    build(&manifest, &output).success();

    let assert = assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("inspect")
        .arg(&output)
        .arg("--json")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let summary: serde_json::Value = serde_json::from_str(&stdout).expect("json summary");

    assert_eq!(summary["product_name"], "sensor-node");
    assert_eq!(summary["component_version"], 3);
    assert_eq!(summary["signed_contents_length"], 376);
    assert_eq!(summary["status"], 0xFFFF_FFFFu32);
    let images = summary["images"].as_array().expect("images array");
    assert_eq!(images.len(), 3);
    assert_eq!(images[0]["target"], "boot");
    assert_eq!(images[0]["method"], "xtea-hmac");
    assert_eq!(images[2]["method"], "none");
    assert_eq!(images[2]["payload_len"], 0);
}

#[test]
fn inspect_prints_human_summary() {
    let (dir, manifest) = workspace(MANIFEST);
    let output = dir.path().join("fw.pack");
    build(&manifest, &output).success();

    assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("inspect")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Product: sensor-node 1.2.0"))
        .stdout(predicate::str::contains("- app (method: xtea-hmac"));
}

#[test]
fn inspect_rejects_non_pack_file() {
    let dir = tempdir().expect("tempdir");
    let junk = dir.path().join("junk.bin");
    fs::write(&junk, [0u8; 64]).expect("write junk");

    assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("inspect")
        .arg(&junk)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to decode pack"));
}

#[test]
fn verify_accepts_built_pack_and_rejects_tampering() {
    let (dir, manifest) = workspace(MANIFEST);
    let output = dir.path().join("fw.pack");
    build(&manifest, &output).success();

    assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("verify")
        .arg("--manifest")
        .arg(&manifest)
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("verified:"))
        .stdout(predicate::str::contains("Images: 3 (2 opened with xtea-hmac)"));

    let mut bytes = fs::read(&output).expect("read pack");
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    let tampered = dir.path().join("tampered.pack");
    fs::write(&tampered, bytes).expect("write tampered");

    assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("verify")
        .arg("--manifest")
        .arg(&manifest)
        .arg(&tampered)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Signature check failed"));
}

#[test]
fn targets_lists_registry() {
    let (_dir, manifest) = workspace(MANIFEST);

    assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("targets")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "- boot (kind: bin, offset: 0x08000000, mandatory: true, order: 1)",
        ))
        .stdout(predicate::str::contains(
            "- reset (kind: command, offset: -, mandatory: false, order: -)",
        ));

    let assert = assert_cmd::cargo::cargo_bin_cmd!("upgrade-pack")
        .arg("targets")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--json")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let targets: serde_json::Value = serde_json::from_str(&stdout).expect("json targets");
    let targets = targets.as_array().expect("array");
    assert_eq!(targets.len(), 3);
    assert_eq!(targets[0]["name"], "boot");
    assert_eq!(targets[0]["kind"], "bin");
    assert_eq!(targets[0]["offset"], 0x0800_0000);
    assert_eq!(targets[1]["kind"], "hex");
    assert_eq!(targets[2]["mandatory"], false);
}
