//! End-to-end CLI tests for the `hac` binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// `hac` with an isolated config directory and no password from the environment.
fn hac(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hac").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("HAC_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    hac(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("administration console"))
        .stdout(predicate::str::contains("test-connection"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    hac(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hac"));
}

#[test]
fn test_binary_requires_subcommand() {
    let home = TempDir::new().unwrap();
    hac(&home).assert().failure();
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    hac(&home)
        .args(["--invalid-flag", "test-connection"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    hac(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config_file = not found (using defaults)"))
        .stdout(predicate::str::contains("url = https://localhost:9002/hac"))
        .stdout(predicate::str::contains("username = admin"))
        .stdout(predicate::str::contains("timeout_ms = 6000"))
        .stdout(predicate::str::contains("replicas = Auto-discover replica"));
}

#[test]
fn test_config_show_reads_profile_and_overrides() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("hac-client");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        r#"
url = "https://stage.example.com/hac/"
username = "deployer"
password = "top-secret"
timeout_ms = 15000
"#,
    )
    .unwrap();

    hac(&home)
        .args(["--username", "admin", "--replica", "api-0", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config_file = loaded"))
        .stdout(predicate::str::contains("url = https://stage.example.com/hac\n"))
        .stdout(predicate::str::contains("username = admin"))
        .stdout(predicate::str::contains("timeout_ms = 15000"))
        .stdout(predicate::str::contains("replica = api-0 (ROUTE=.api-0)"))
        .stdout(predicate::str::contains("top-secret").not());
}

#[test]
fn test_config_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    let profile = home.path().join("profile.toml");
    std::fs::write(&profile, "proxy = \"http://proxy\"\n").unwrap();

    hac(&home)
        .arg("--config")
        .arg(&profile)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_connection_to_unreachable_host_fails() {
    let home = TempDir::new().unwrap();
    hac(&home)
        .args(["--url", "http://127.0.0.1:1/hac", "-q", "test-connection"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to obtain sessionId"));
}

#[test]
fn test_groovy_missing_script_file_fails() {
    let home = TempDir::new().unwrap();
    hac(&home)
        .args(["-q", "groovy", "/definitely/not/here.groovy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_against_mock_console() {
    let server = MockServer::start().await;
    support::mount_console(&server, 1).await;
    let url = format!("{}/hac", server.uri());

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        hac(&home)
            .args(["--url", url.as_str(), "test-connection"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Connected to"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_groovy_from_stdin_prints_output() {
    let server = MockServer::start().await;
    support::mount_console(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/hac/console/scripting/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"outputText":"hello from groovy","executionResult":"","stacktraceText":""}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    let url = format!("{}/hac", server.uri());

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        hac(&home)
            .args(["-q", "--url", url.as_str(), "groovy", "-"])
            .write_stdin("println 'hello from groovy'")
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("hello from groovy"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_groovy_stacktrace_exits_with_failure() {
    let server = MockServer::start().await;
    support::mount_console(&server, 1).await;
    Mock::given(method("POST"))
        .and(path("/hac/console/scripting/execute"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"stacktraceText":"groovy.lang.MissingMethodException: boom"}"#,
        ))
        .mount(&server)
        .await;
    let url = format!("{}/hac", server.uri());

    let assert = tokio::task::spawn_blocking(move || {
        let home = TempDir::new().unwrap();
        hac(&home)
            .args(["-q", "--url", url.as_str(), "groovy", "-"])
            .write_stdin("boom()")
            .assert()
    })
    .await
    .unwrap();

    assert
        .code(1)
        .stderr(predicate::str::contains("MissingMethodException"));
}
