//! End-to-end CLI tests for the test-content-downloader binary.

use assert_cmd::Command;
use predicates::prelude::*;

const PIPELINE_VARS: [&str; 5] = [
    "SYSTEM_TEAMFOUNDATIONCOLLECTIONURI",
    "SYSTEM_TEAMPROJECT",
    "SYSTEM_ACCESSTOKEN",
    "BUILD_BUILDURI",
    "COMMON_TESTRESULTSDIRECTORY",
];

fn binary() -> Command {
    let mut cmd = Command::cargo_bin("test-content-downloader").unwrap();
    for var in PIPELINE_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    binary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("test results and coverage files"))
        .stdout(predicate::str::contains("pipeline"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    binary()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("test-content-downloader"));
}

/// Test that a subcommand is required.
#[test]
fn test_binary_without_subcommand_fails() {
    binary().assert().failure();
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    binary()
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

/// Test that `pipeline` names the first missing agent variable.
#[test]
fn test_binary_pipeline_reports_missing_variable() {
    binary()
        .arg("pipeline")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SYSTEM_TEAMFOUNDATIONCOLLECTIONURI"));
}

/// Test that `build` rejects a project URI that is not http(s).
#[test]
fn test_binary_build_rejects_invalid_project_uri() {
    binary()
        .args([
            "build",
            "--project-uri",
            "ftp://example.com/proj",
            "--token",
            "pat",
            "--build-uri",
            "vstfs:///Build/Build/1",
            "--output",
            "out",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid project URI"));
}

/// Test that `build` without a token fails when the agent variable is unset.
#[test]
fn test_binary_build_requires_token() {
    binary()
        .args([
            "build",
            "--project-uri",
            "https://example.com/proj",
            "--build-uri",
            "vstfs:///Build/Build/1",
            "--output",
            "out",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--token"));
}
