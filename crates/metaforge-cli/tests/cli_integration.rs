//! CLI subprocess integration tests.
//!
//! These tests invoke the `metaforge` binary as a subprocess and verify exit
//! codes, stdout content, and the generated configuration files. No test here
//! touches the network; repository work is covered by the core integration
//! suite.

use std::path::Path;
use std::process::Command;

fn metaforge_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_metaforge"))
}

fn write_empty_doc(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("bblayers.json");
    std::fs::write(&path, "{}\n").unwrap();
    path
}

#[test]
fn cli_version_exits_zero() {
    let output = metaforge_bin().arg("--version").output().unwrap();
    assert!(output.status.success(), "metaforge --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("metaforge"),
        "version output must contain 'metaforge': {stdout}"
    );
}

#[test]
fn cli_help_lists_subcommands() {
    let output = metaforge_bin().arg("--help").output().unwrap();
    assert!(output.status.success(), "metaforge --help must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("setup"), "help must list 'setup'");
    assert!(stdout.contains("plan"), "help must list 'plan'");
    assert!(stdout.contains("doctor"), "help must list 'doctor'");
}

#[test]
fn setup_without_manifest_source_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = metaforge_bin()
        .current_dir(dir.path())
        .args(["setup", "-m", "beaglebone", "-d", "angstrom"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration error"), "stderr: {stderr}");
}

#[test]
fn setup_with_malformed_manifest_is_a_manifest_error() {
    let dir = tempfile::tempdir().unwrap();
    let layers = dir.path().join("layers.txt");
    std::fs::write(&layers, "only,three,fields\n").unwrap();

    let output = metaforge_bin()
        .current_dir(dir.path())
        .args([
            "setup",
            "-m",
            "beaglebone",
            "-d",
            "angstrom",
            "--layers",
            &layers.display().to_string(),
        ])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("manifest error"), "stderr: {stderr}");
}

#[test]
fn setup_writes_configuration_files() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_empty_doc(dir.path());

    let output = metaforge_bin()
        .current_dir(dir.path())
        .args([
            "setup",
            "-m",
            "beaglebone",
            "-d",
            "angstrom-next",
            "--bblayers",
            &doc.display().to_string(),
        ])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "setup must exit 0. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let conf = dir.path().join("build").join("conf");
    for name in ["auto.conf", "bblayers.conf", "local.conf", "site.conf"] {
        assert!(conf.join(name).is_file(), "{name} must be written");
    }
    assert!(dir.path().join("env-angstrom_next_beaglebone").is_file());

    let auto_conf = std::fs::read_to_string(conf.join("auto.conf")).unwrap();
    assert_eq!(auto_conf, "MACHINE ?= \"beaglebone\"\n");
    let bblayers = std::fs::read_to_string(conf.join("bblayers.conf")).unwrap();
    assert!(bblayers.contains("meta-openembedded/meta-oe"));
}

#[test]
fn setup_keeps_existing_configuration_without_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_empty_doc(dir.path());
    let conf_dir = dir.path().join("build").join("conf");
    std::fs::create_dir_all(&conf_dir).unwrap();
    std::fs::write(conf_dir.join("local.conf"), "# hand-edited\n").unwrap();

    let run = |extra: &[&str]| {
        let mut args: Vec<String> = ["setup", "-m", "beaglebone", "-d", "angstrom", "--bblayers"]
            .iter()
            .map(ToString::to_string)
            .collect();
        args.push(doc.display().to_string());
        args.extend(extra.iter().map(ToString::to_string));
        metaforge_bin()
            .current_dir(dir.path())
            .args(&args)
            .output()
            .unwrap()
    };

    let output = run(&[]);
    assert!(output.status.success());
    assert_eq!(
        std::fs::read_to_string(conf_dir.join("local.conf")).unwrap(),
        "# hand-edited\n"
    );

    let output = run(&["--overwrite"]);
    assert!(output.status.success());
    let replaced = std::fs::read_to_string(conf_dir.join("local.conf")).unwrap();
    assert!(replaced.contains("DISTRO = \"angstrom\""));
}

#[test]
fn setup_json_emits_report() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_empty_doc(dir.path());

    let output = metaforge_bin()
        .current_dir(dir.path())
        .args([
            "--json",
            "setup",
            "-m",
            "beaglebone",
            "-d",
            "angstrom",
            "--bblayers",
            &doc.display().to_string(),
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("valid JSON report");
    assert!(json["layers"].is_array());
    assert_eq!(json["interrupted"], serde_json::Value::Bool(false));
}

#[test]
fn plan_reports_clone_for_absent_layer() {
    let dir = tempfile::tempdir().unwrap();
    let layers = dir.path().join("layers.txt");
    std::fs::write(&layers, "meta-oe,https://example/meta-oe.git,master,HEAD\n").unwrap();

    let output = metaforge_bin()
        .current_dir(dir.path())
        .args(["plan", "--layers", &layers.display().to_string()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("meta-oe: clone https://example/meta-oe.git"),
        "stdout: {stdout}"
    );
}

#[test]
fn plan_json_is_machine_readable() {
    let dir = tempfile::tempdir().unwrap();
    let layers = dir.path().join("layers.txt");
    std::fs::write(&layers, "meta-oe,https://example/meta-oe.git,master,abc123\n").unwrap();

    let output = metaforge_bin()
        .current_dir(dir.path())
        .args(["--json", "plan", "--layers", &layers.display().to_string()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).expect("valid JSON plan");
    assert_eq!(json["layers"][0]["name"], "meta-oe");
    assert_eq!(json["layers"][0]["actions"][0]["action"], "clone");
}

#[test]
fn doctor_runs_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let output = metaforge_bin()
        .current_dir(dir.path())
        .arg("doctor")
        .output()
        .unwrap();

    // Healthy or not depends on the host; the command itself must not crash.
    assert!(matches!(output.status.code(), Some(0 | 1)));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Doctor"), "stdout: {stdout}");
}

#[test]
fn completions_generate_for_bash() {
    let output = metaforge_bin()
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("metaforge"));
}
