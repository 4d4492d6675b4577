//! Integration tests for the sliceback CLI.
//!
//! Note: Tests use `unwrap`/`expect` which is acceptable in test code.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sliceback_cmd() -> Command {
    Command::cargo_bin("sliceback").expect("sliceback binary should build")
}

fn write_tree(root: &std::path::Path) {
    fs::create_dir(root.join("sub")).expect("failed to create sub dir");
    fs::write(root.join("a.txt"), "a content").expect("failed to write a.txt");
    fs::write(root.join("sub").join("b.txt"), "b content").expect("failed to write b.txt");
}

#[test]
fn test_version_flag() {
    sliceback_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sliceback"));
}

#[test]
fn test_help_flag() {
    sliceback_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Command-line utility"));
}

#[test]
fn test_backup_help() {
    sliceback_cmd()
        .arg("backup")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--include"))
        .stdout(predicate::str::contains("--target"));
}

#[test]
fn test_backup_runs_successfully() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--include")
        .arg(src.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup complete"));
}

#[test]
fn test_backup_writes_a_slice_to_the_target() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--prefix")
        .arg("run")
        .arg("--include")
        .arg(src.path())
        .assert()
        .success();

    let slices: Vec<_> = fs::read_dir(dst.path())
        .expect("failed to read target dir")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(slices.iter().any(|name| name.starts_with("run.") && name.ends_with(".tar")));
}

#[test]
fn test_backup_json_output_format() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    let output = sliceback_cmd()
        .arg("--json")
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--include")
        .arg(src.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).expect("invalid JSON output");
    assert_eq!(json["status"], "success");
    assert_eq!(json["operation"], "backup");
    assert_eq!(json["data"]["outcome"], "completed");
    assert!(json["data"]["total_files"].as_u64().unwrap() > 0);
    assert!(json["data"]["slices_written"].as_u64().unwrap() > 0);
}

#[test]
fn test_backup_with_no_includes_fails() {
    let dst = TempDir::new().expect("failed to create target dir");

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_backup_quiet_mode_produces_no_stdout() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    let output = sliceback_cmd()
        .arg("--quiet")
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--include")
        .arg(src.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert!(output.is_empty());
}

#[test]
fn test_backup_excludes_a_file_under_an_include_root() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--include")
        .arg(src.path())
        .arg("--exclude")
        .arg(src.path().join("a.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Files archived:   1"));
}

#[test]
fn test_backup_max_slice_size_accepts_suffixed_value() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--max-slice-size")
        .arg("10M")
        .arg("--include")
        .arg(src.path())
        .assert()
        .success();
}

#[test]
fn test_backup_invalid_max_slice_size_is_rejected() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--max-slice-size")
        .arg("bogus")
        .arg("--include")
        .arg(src.path())
        .assert()
        .failure();
}

#[test]
fn test_backup_with_profile_file() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    let profile_dir = TempDir::new().expect("failed to create profile dir");
    let profile_path = profile_dir.path().join("profile.txt");
    fs::write(
        &profile_path,
        format!(
            "M {}\nP nightly\nS 0\nI {}\n",
            dst.path().display(),
            src.path().display()
        ),
    )
    .expect("failed to write profile");

    sliceback_cmd()
        .arg("backup")
        .arg("--profile")
        .arg(&profile_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup complete"));
}

#[test]
fn test_backup_with_malformed_profile_reports_line_number() {
    let profile_dir = TempDir::new().expect("failed to create profile dir");
    let profile_path = profile_dir.path().join("profile.txt");
    fs::write(&profile_path, "M /some/target\nS not-a-number\n").expect("failed to write profile");

    sliceback_cmd()
        .arg("backup")
        .arg("--profile")
        .arg(&profile_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid profile line 2"));
}

#[test]
fn test_backup_compress_flag_produces_a_slice() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--compress")
        .arg("--include")
        .arg(src.path())
        .assert()
        .success();

    let has_slice = fs::read_dir(dst.path())
        .expect("failed to read target dir")
        .filter_map(Result::ok)
        .any(|entry| entry.file_name().to_string_lossy().ends_with(".tar"));
    assert!(has_slice);
}

#[test]
fn test_backup_verbose_lists_skipped_files() {
    let src = TempDir::new().expect("failed to create source dir");
    fs::write(src.path().join("too_big.bin"), vec![b'x'; 2 * 1024 * 1024])
        .expect("failed to write oversize file");
    let dst = TempDir::new().expect("failed to create target dir");

    // A file larger than the whole slice budget can never fit, so it is
    // skipped rather than blocking the run.
    sliceback_cmd()
        .arg("--verbose")
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--max-slice-size")
        .arg("1M")
        .arg("--include")
        .arg(src.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup complete, with skipped files"))
        .stdout(predicate::str::contains("Skipped:"));
}

#[test]
fn test_backup_nonexistent_target_directory_fails() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());

    sliceback_cmd()
        .arg("backup")
        .arg("--target")
        .arg("/nonexistent/path/for/sliceback/tests")
        .arg("--include")
        .arg(src.path())
        .assert()
        .failure();
}

#[test]
fn test_backup_resolves_relative_include_and_exclude_to_absolute() {
    let src = TempDir::new().expect("failed to create source dir");
    write_tree(src.path());
    let dst = TempDir::new().expect("failed to create target dir");

    // Both the include root and the exclude are given relative to the
    // child process's working directory (set below, not ours), and the
    // exclude additionally carries a trailing separator.
    sliceback_cmd()
        .current_dir(src.path())
        .arg("backup")
        .arg("--target")
        .arg(dst.path())
        .arg("--include")
        .arg(".")
        .arg("--exclude")
        .arg("sub/")
        .assert()
        .success()
        .stdout(predicate::str::contains("Files archived:   1"));
}

#[test]
fn test_global_quiet_and_verbose_conflict() {
    sliceback_cmd()
        .arg("--quiet")
        .arg("--verbose")
        .arg("backup")
        .arg("--include")
        .arg(".")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
