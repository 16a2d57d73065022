use assert_cmd::Command;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;
use tempfile::TempDir;

fn parse_webidl_cli() -> Command {
  assert_cmd::cargo::cargo_bin_cmd!("parse-webidl-cli")
}

fn parse_stdout_json(stdout: &[u8]) -> Value {
  serde_json::from_slice(stdout).expect("stdout should be valid JSON")
}

fn write(dir: &TempDir, name: &str, source: &str) -> PathBuf {
  let path = dir.path().join(name);
  std::fs::write(&path, source).unwrap();
  path
}

#[test]
fn emits_program_as_json() {
  let dir = tempdir().unwrap();
  let path = write(&dir, "a.webidl", "interface A { undefined f(); };");

  let assert = parse_webidl_cli()
    .timeout(Duration::from_secs(5))
    .arg(&path)
    .assert()
    .success();

  let output = parse_stdout_json(&assert.get_output().stdout);
  assert_eq!(output["schema_version"], 1);
  assert_eq!(output["options"]["primary_global"], "Window");
  let a = &output["program"]["defs"][0]["Interface"];
  assert_eq!(a["ident"]["name"], "A");
  assert_eq!(a["exposure"][0], "Window");
  assert_eq!(output["program"]["members"][0]["ident"]["name"], "f");
}

#[test]
fn files_are_validated_together() {
  let dir = tempdir().unwrap();
  let first = write(&dir, "partial.webidl", "partial interface A { attribute long x; };");
  let second = write(&dir, "a.webidl", "interface A {};");

  let assert = parse_webidl_cli()
    .timeout(Duration::from_secs(5))
    .arg(&first)
    .arg(&second)
    .assert()
    .success();

  let output = parse_stdout_json(&assert.get_output().stdout);
  assert_eq!(output["program"]["order"].as_array().unwrap().len(), 1);
  assert_eq!(output["program"]["members"][0]["ident"]["name"], "x");
}

#[test]
fn options_flags() {
  let dir = tempdir().unwrap();
  let path = write(&dir, "d.webidl", "dictionary D { long b; long a; }; interface I {};");

  let assert = parse_webidl_cli()
    .timeout(Duration::from_secs(5))
    .arg("--primary-global")
    .arg("Worker")
    .arg("--unsorted-dictionaries")
    .arg("--pretty")
    .arg(&path)
    .assert()
    .success();

  let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
  assert!(stdout.contains("\n  \"schema_version\": 1"));
  let output = parse_stdout_json(stdout.as_bytes());
  assert_eq!(output["options"]["sort_dictionary_members"], false);
  let d = &output["program"]["defs"][0]["Dictionary"];
  assert_eq!(d["members"][0]["ident"]["name"], "b");
  assert_eq!(output["program"]["defs"][1]["Interface"]["exposure"][0], "Worker");
}

#[test]
fn prints_error_and_fails() {
  let dir = tempdir().unwrap();
  let path = write(&dir, "bad.webidl", "interface A { attribute Missing m; };");

  let assert = parse_webidl_cli()
    .timeout(Duration::from_secs(5))
    .arg(&path)
    .assert()
    .failure()
    .code(1);

  assert!(assert.get_output().stdout.is_empty());
  let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
  assert!(stderr.starts_with("error: "), "got: {stderr}");
  assert!(stderr.contains("bad.webidl line 1:25"), "got: {stderr}");
  assert!(stderr.contains('^'));
}

#[test]
fn syntax_errors_fail_before_finish() {
  let dir = tempdir().unwrap();
  let path = write(&dir, "syntax.webidl", "interface A {");

  let assert = parse_webidl_cli()
    .timeout(Duration::from_secs(5))
    .arg(&path)
    .assert()
    .failure()
    .code(1);

  let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
  assert!(stderr.contains("syntax.webidl"), "got: {stderr}");
}

#[test]
fn missing_file_fails() {
  let dir = tempdir().unwrap();
  let assert = parse_webidl_cli()
    .timeout(Duration::from_secs(5))
    .arg(dir.path().join("absent.webidl"))
    .assert()
    .failure()
    .code(1);

  let stderr = String::from_utf8_lossy(&assert.get_output().stderr);
  assert!(stderr.contains("failed to read"), "got: {stderr}");
}
