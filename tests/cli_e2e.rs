//! End-to-end CLI tests for the pubfetch binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use support::fixtures::{self, CHAPTER};
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

/// Binary isolated from any user config file.
fn pubfetch(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("pubfetch").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG")
        .env_remove("PUBFETCH_PASSWORD");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    pubfetch(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Read publication resources"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    pubfetch(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pubfetch"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let home = TempDir::new().unwrap();
    pubfetch(&home).assert().failure();
}

#[test]
fn test_ls_lists_entries_with_media_types() {
    let home = TempDir::new().unwrap();
    let (_dir, epub) = fixtures::epub();
    pubfetch(&home)
        .arg("ls")
        .arg(&epub)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "/OEBPS/chapter1.xhtml\tapplication/xhtml+xml",
        ))
        .stdout(predicate::str::contains("/mimetype\t-"));
}

#[test]
fn test_cat_range_of_stored_entry() {
    let home = TempDir::new().unwrap();
    let (_dir, epub) = fixtures::epub();
    pubfetch(&home)
        .arg("cat")
        .arg(&epub)
        .args(["/mimetype", "--range", "0..11"])
        .assert()
        .success()
        .stdout("application");
}

#[test]
fn test_cat_buffered_reads_whole_chapter() {
    let home = TempDir::new().unwrap();
    let dir = fixtures::exploded();
    pubfetch(&home)
        .arg("cat")
        .arg(dir.path())
        .args(["OEBPS/chapter1.xhtml", "--buffer", "16"])
        .assert()
        .success()
        .stdout(CHAPTER);
}

#[test]
fn test_text_extracts_chapter_body() {
    let home = TempDir::new().unwrap();
    let (_dir, epub) = fixtures::epub();
    pubfetch(&home)
        .arg("text")
        .arg(&epub)
        .arg("/OEBPS/chapter1.xhtml")
        .assert()
        .success()
        .stdout("Loomings Call me Ishmael.\n");
}

#[test]
fn test_cat_unknown_entry_fails() {
    let home = TempDir::new().unwrap();
    let (_dir, epub) = fixtures::epub();
    pubfetch(&home)
        .arg("cat")
        .arg(&epub)
        .arg("/nope.xhtml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read '/nope.xhtml'"));
}

#[test]
fn test_missing_source_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("missing.epub");
    pubfetch(&home)
        .arg("ls")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn test_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("pubfetch.toml");
    std::fs::write(&config, "buffer_size = 0\n").unwrap();
    let dir = fixtures::exploded();
    pubfetch(&home)
        .arg("--config")
        .arg(&config)
        .arg("ls")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("buffer_size"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_writes_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = fixtures::content(64 * 1024);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = home.path().join("book.epub");
    let url = format!("{}/book.epub", server.uri());
    let mut cmd = pubfetch(&home);
    let assert = tokio::task::spawn_blocking(move || {
        cmd.arg("-q").arg("download").arg(&url).arg(&output).assert()
    })
    .await
    .unwrap();
    assert.success();

    assert_eq!(std::fs::read(home.path().join("book.epub")).unwrap(), body);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_not_found_fails() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let output = home.path().join("book.epub");
    let url = format!("{}/book.epub", server.uri());
    let mut cmd = pubfetch(&home);
    let assert = tokio::task::spawn_blocking(move || {
        cmd.arg("download").arg(&url).arg(&output).assert()
    })
    .await
    .unwrap();
    assert
        .failure()
        .stderr(predicate::str::contains("Failed to download"));
}
