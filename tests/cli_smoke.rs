// End-to-end smoke tests driving the compiled binary directly, the way
// the teacher's tests/*_smoke.rs files exercise `rup`/`roughup` subcommands.
use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::process::Command;

fn bin(tmp: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nexus3c").expect("bin");
    cmd.current_dir(tmp.path());
    cmd
}

#[test]
fn read_file_round_trips_a_written_file() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let file = tmp.child("hello.txt");
    file.write_str("line one\nline two\nline three\n").expect("write");

    let assert = bin(&tmp).args(["read-file", "hello.txt"]).assert().success();
    let stdout = assert.get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&stdout).expect("json output");

    assert!(value["success"].as_bool().unwrap());
    let content = value["output"]["content"].as_str().unwrap();
    assert!(content.contains("line one"));
    assert!(content.contains("line three"));
}

#[test]
fn read_file_outside_allowed_path_is_denied() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let sandbox = tmp.child("sandbox");
    sandbox.create_dir_all().expect("mkdir sandbox");
    let secret = tmp.child("secret.txt");
    secret.write_str("do not read me").expect("write");

    let assert = bin(&tmp)
        .args(["--allowed-path", "sandbox", "read-file", "../secret.txt"])
        .assert()
        .success();
    let stdout = assert.get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&stdout).expect("json output");

    assert!(!value["success"].as_bool().unwrap());
    assert!(value["error"].as_str().unwrap().to_lowercase().contains("outside"));
}

#[test]
fn mkdir_then_file_info_reports_directory_type() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    bin(&tmp).args(["mkdir", "nested/dir", "--parents"]).assert().success();

    let assert = bin(&tmp).args(["file-info", "nested/dir"]).assert().success();
    let value: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert!(value["success"].as_bool().unwrap());
    assert_eq!(value["output"]["is_dir"], Value::Bool(true));
}

#[test]
fn copy_then_paste_moves_a_line_range_through_the_clipboard() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let source = tmp.child("source.rs");
    source.write_str("fn a() {}\nfn b() {}\nfn c() {}\n").expect("write");
    let target = tmp.child("target.rs");
    target.write_str("// target\n").expect("write");

    bin(&tmp)
        .args(["copy", "source.rs", "snippet", "--start-line", "2", "--end-line", "2"])
        .assert()
        .success();

    let assert = bin(&tmp)
        .args(["paste", "snippet", "target.rs", "--mode", "append"])
        .assert()
        .success();
    let value: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert!(value["success"].as_bool().unwrap());

    target.assert(predicate::str::contains("fn b()"));
}

#[test]
fn patch_strict_mode_applies_a_clean_unified_diff() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    let target = tmp.child("lib.rs");
    target.write_str("fn greet() {\n    println!(\"hi\");\n}\n").expect("write");

    let diff = "--- a/lib.rs\n+++ b/lib.rs\n@@ -1,3 +1,3 @@\n fn greet() {\n-    println!(\"hi\");\n+    println!(\"hello\");\n }\n";

    let assert = bin(&tmp).args(["patch", "lib.rs", "--diff", diff]).assert().success();
    let value: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert!(value["success"].as_bool().unwrap());

    target.assert(predicate::str::contains("hello"));
}

#[test]
fn vcs_rejects_dangerous_flags_in_sandboxed_state() {
    let tmp = assert_fs::TempDir::new().expect("tempdir");
    Command::new("git").args(["init", "-q"]).current_dir(tmp.path()).assert().success();

    let assert = bin(&tmp).args(["vcs", "reset --hard"]).assert().success();
    let value: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json");
    assert!(!value["success"].as_bool().unwrap());
}
