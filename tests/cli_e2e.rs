//! End-to-end CLI tests for the image-fetcher binary.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::loopback::try_mock_server;
use support::{file_names, mount_image};

/// Empty stdin means no URLs: nothing to fetch, exit 0, destination prepared.
#[test]
fn test_binary_empty_stdin_returns_zero_and_creates_destination() {
    let temp_dir = TempDir::new().unwrap();
    let output_dir = temp_dir.path().join("out");
    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    cmd.arg("-o")
        .arg(&output_dir)
        .write_stdin("")
        .assert()
        .success();

    assert!(output_dir.is_dir(), "destination should exist after an empty run");
}

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetch images politely"))
        .stdout(predicate::str::contains("--output-dir"));
}

#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("image-fetcher"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_concurrency_out_of_range_rejected() {
    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    cmd.args(["-c", "17", "https://example.com/a.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("17"));
}

/// Destination that cannot be created is fatal before any request.
#[test]
fn test_binary_unusable_output_dir_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("a-file");
    std::fs::write(&blocker, b"occupied").unwrap();

    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    let assert = cmd
        .arg("-o")
        .arg(&blocker)
        .arg("http://127.0.0.1:9/never.png")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not create destination directory"));
    assert_eq!(assert.get_output().status.code(), Some(2));
}

#[tokio::test]
async fn test_binary_partial_success_exit_code_is_one() {
    let Some(mock_server) = try_mock_server().await else {
        return;
    };
    mount_image(&mock_server, "/ok.png", "image/png", b"ok png").await;
    Mock::given(method("HEAD"))
        .and(path("/fail.png"))
        .respond_with(ResponseTemplate::new(200).insert_header("Content-Type", "image/png"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fail.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    let assert = cmd
        .arg("--output-dir")
        .arg(temp_dir.path())
        .args(["-d", "0"])
        .arg(format!("{}/ok.png", mock_server.uri()))
        .arg(format!("{}/fail.png", mock_server.uri()))
        .assert()
        .failure()
        .stdout(predicate::str::contains("Fetched 1 of 2 images"))
        .stdout(predicate::str::contains("http_status(404)"));

    assert_eq!(
        assert.get_output().status.code(),
        Some(1),
        "partial success must yield exit code 1"
    );
    assert_eq!(file_names(temp_dir.path()), ["ok.png"]);
}

#[tokio::test]
async fn test_binary_reads_urls_from_stdin_and_prints_json() {
    let Some(mock_server) = try_mock_server().await else {
        return;
    };
    mount_image(&mock_server, "/first.jpg", "image/jpeg", b"jpeg one").await;
    mount_image(&mock_server, "/second.jpg", "image/jpeg", b"jpeg one").await;

    let temp_dir = TempDir::new().unwrap();
    let stdin = format!(
        "  {uri}/first.jpg  \n\n{uri}/second.jpg\n",
        uri = mock_server.uri()
    );

    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    let assert = cmd
        .arg("-o")
        .arg(temp_dir.path())
        .args(["--delay", "0", "-c", "1", "--json", "-q"])
        .write_stdin(stdin)
        .assert()
        .code(1);

    let report: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["attempted"], 2);
    assert_eq!(report["succeeded"], 1);
    assert_eq!(report["items"][0]["status"], "stored");
    assert_eq!(report["items"][0]["file"]["file_name"], "first.jpg");
    assert_eq!(report["items"][1]["error_kind"], "duplicate_content");
    assert_eq!(file_names(temp_dir.path()), ["first.jpg"]);
}

#[tokio::test]
async fn test_binary_all_stored_exit_code_is_zero() {
    let Some(mock_server) = try_mock_server().await else {
        return;
    };
    mount_image(&mock_server, "/only.gif", "image/gif", b"gif").await;

    let temp_dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("image-fetcher").unwrap();
    cmd.arg("-o")
        .arg(temp_dir.path())
        .arg(format!("{}/only.gif", mock_server.uri()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetched 1 of 1 images"));
}
