//! CLI smoke tests for kiln.
//!
//! These tests run the binary against small configurations built from the
//! `null` artifact type and check exit codes and output.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the kiln binary.
fn kiln_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("kiln");
  cmd.env_remove("KILN_LOG").env_remove("RUST_LOG");
  cmd
}

/// Create a temp directory holding the given files.
fn temp_config(files: &[(&str, &str)]) -> TempDir {
  let temp = TempDir::new().unwrap();
  for (name, content) in files {
    std::fs::write(temp.path().join(name), content).unwrap();
  }
  temp
}

/// Two images, the second built from the first, declared in separate files.
const BASE: &str = r#"{
  "artifact": [
    { "type": "null", "name": "base", "provisioner": [ { "type": "shell", "inline": ["echo hi"] } ] }
  ]
}"#;

const DERIVED: &str = r#"{
  "artifact": [
    { "type": "null", "name": "derived", "source": "artifact.null.base" }
  ]
}"#;

const FAILING: &str = r#"{
  "artifact": [
    { "type": "null", "name": "broken", "fail": true,
      "artifact": [ { "type": "null", "name": "never" } ] }
  ]
}"#;

const UNKNOWN_TYPE: &str = r#"{
  "artifact": [
    { "type": "docker", "name": "x" }
  ]
}"#;

const DANGLING: &str = r#"{
  "artifact": [
    { "type": "null", "name": "orphan", "source": "artifact.null.missing" }
  ]
}"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  kiln_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  kiln_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("kiln"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["inspect", "validate", "build"] {
    kiln_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// inspect
// =============================================================================

#[test]
fn inspect_nests_sourced_artifacts() {
  let temp = temp_config(&[("a.json", BASE), ("b.json", DERIVED)]);

  kiln_cmd()
    .arg("inspect")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("artifact.null.base [shell]"))
    .stdout(predicate::str::contains("\n  artifact.null.derived"))
    .stdout(predicate::str::contains("Artifacts: 2"));
}

#[test]
fn inspect_json_output() {
  let temp = temp_config(&[("a.json", BASE), ("b.json", DERIVED)]);

  let output = kiln_cmd()
    .arg("inspect")
    .arg(temp.path())
    .args(["--format", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["artifacts"], 2);
  assert_eq!(json["artifact"][0]["name"], "base");
  assert_eq!(json["artifact"][0]["artifact"][0]["name"], "derived");
  assert!(json["artifact"][0]["artifact"][0].get("source").is_none());
}

#[test]
fn inspect_empty_directory_warns() {
  let temp = TempDir::new().unwrap();

  kiln_cmd()
    .arg("inspect")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("No recognized file type found"));
}

#[test]
fn inspect_missing_path_fails() {
  kiln_cmd()
    .arg("inspect")
    .arg("/nonexistent/path/kiln")
    .assert()
    .failure()
    .stdout(predicate::str::contains("Failed to stat"));
}

#[test]
fn inspect_invalid_json_fails() {
  let temp = temp_config(&[("bad.json", "{\n  \"artifact\": [\n    { \"type\": \"null\", }\n  ]\n}")]);

  kiln_cmd()
    .arg("inspect")
    .arg(temp.path())
    .assert()
    .failure()
    .stdout(predicate::str::contains("Invalid configuration"))
    .stdout(predicate::str::contains("line 3"));
}

#[test]
fn inspect_dangling_source_fails() {
  let temp = temp_config(&[("c.json", DANGLING)]);

  kiln_cmd()
    .arg("inspect")
    .arg(temp.path())
    .assert()
    .failure()
    .stdout(predicate::str::contains("Source not found"))
    .stdout(predicate::str::contains("artifact.null.missing"));
}

// =============================================================================
// validate & build
// =============================================================================

#[test]
fn validate_null_artifacts() {
  let temp = temp_config(&[("a.json", BASE), ("b.json", DERIVED)]);

  kiln_cmd()
    .arg("validate")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Validation finished for 2 artifact(s)"));
}

#[test]
fn build_null_artifacts() {
  let temp = temp_config(&[("a.json", BASE), ("b.json", DERIVED)]);

  kiln_cmd()
    .arg("build")
    .arg(temp.path())
    .args(["--parallelism", "2", "--no-color"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Build finished for 2 artifact(s)"));
}

#[test]
fn build_in_debug_mode() {
  let temp = temp_config(&[("a.json", BASE), ("b.json", DERIVED)]);

  kiln_cmd().arg("build").arg(temp.path()).arg("--debug").assert().success();
}

#[test]
fn build_reports_failing_artifact() {
  let temp = temp_config(&[("f.json", FAILING)]);

  kiln_cmd()
    .arg("build")
    .arg(temp.path())
    .arg("--no-color")
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Error: Artifact artifact.null.broken configured to fail"))
    .stdout(predicate::str::contains("never").not())
    .stderr(predicate::str::contains("Build failed with 1 error(s)"));
}

#[test]
fn build_reports_unknown_type() {
  let temp = temp_config(&[("x.json", UNKNOWN_TYPE)]);

  kiln_cmd()
    .arg("build")
    .arg(temp.path())
    .assert()
    .code(1)
    .stdout(predicate::str::contains("Error getting component docker"));
}

#[test]
fn build_rejects_zero_parallelism() {
  let temp = temp_config(&[("a.json", BASE)]);

  kiln_cmd()
    .arg("build")
    .arg(temp.path())
    .args(["--parallelism", "0"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("parallelism"));
}
