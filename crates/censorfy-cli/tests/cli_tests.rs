//! Integration tests for the `censorfy` CLI binary.
//!
//! The CLI runs as a subprocess with its token file in a temp directory.
//! Tests that need the auth service point it at a wiremock server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::Command;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: run censorfy with args and return (`exit_code`, stdout, stderr).
fn run(token_file: &Path, api_url: &str, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_censorfy"))
        .args(args)
        .env("CENSORFY_API_URL", api_url)
        .env("CENSORFY_RELAY_URL", api_url)
        .env("CENSORFY_TOKEN_FILE", token_file)
        .env_remove("CENSORFY_PASSWORD")
        .output()
        .expect("failed to execute censorfy");

    let code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (code, stdout, stderr)
}

// Nothing listens here.
const DEAD_URL: &str = "http://127.0.0.1:9";

// ── Version & help ───────────────────────────────────────────────────

#[test]
fn test_version_flag() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&dir.path().join("token"), DEAD_URL, &["--version"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("censorfy"), "version output: {stdout}");
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&dir.path().join("token"), DEAD_URL, &["--help"]);
    assert_eq!(code, 0);
    for cmd in ["login", "signup", "logout", "keys", "check"] {
        assert!(stdout.contains(cmd), "help should list '{cmd}': {stdout}");
    }
}

// ── Session handling ─────────────────────────────────────────────────

#[test]
fn test_keys_without_session_asks_for_login() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run(&dir.path().join("token"), DEAD_URL, &["keys", "list"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("censorfy login"), "stderr: {stderr}");
}

#[test]
fn test_key_mutations_without_session_ask_for_login() {
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");
    for args in [&["keys", "create"][..], &["keys", "delete", "k1"][..]] {
        let (code, _, stderr) = run(&token_file, DEAD_URL, args);
        assert_ne!(code, 0, "{args:?} should fail");
        assert!(stderr.contains("censorfy login"), "{args:?} stderr: {stderr}");
    }
}

#[test]
fn test_logout_removes_token_file() {
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");
    std::fs::write(&token_file, "tok-1").unwrap();

    let (code, stdout, _) = run(&token_file, DEAD_URL, &["logout"]);
    assert_eq!(code, 0, "stdout: {stdout}");
    assert!(!token_file.exists());
}

#[test]
fn test_logout_without_session_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, _) = run(&dir.path().join("token"), DEAD_URL, &["logout"]);
    assert_eq!(code, 0);
}

#[test]
fn test_status_reports_logged_out() {
    let dir = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run(&dir.path().join("token"), DEAD_URL, &["status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("not logged in"), "stdout: {stdout}");
}

#[test]
fn test_unreachable_service_shows_fallback_message() {
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");
    std::fs::write(&token_file, "tok-1").unwrap();

    let (code, _, stderr) = run(&token_file, DEAD_URL, &["keys", "create"]);
    assert_ne!(code, 0);
    assert!(
        stderr.contains("An unknown error occurred while creating API key"),
        "stderr: {stderr}"
    );
}

#[test]
fn test_check_rejects_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");
    std::fs::write(&token_file, "tok-1").unwrap();

    let (code, _, stderr) = run(&token_file, DEAD_URL, &["check", "{oops"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("JSON"), "stderr: {stderr}");
}

// ── Against a mocked service ─────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_login_saves_token_and_lists_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-42" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/keys"))
        .and(header("authorization", "Bearer tok-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "key": "key-one", "_id": "1" },
            { "key": "key-two", "_id": "2" }
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");
    let uri = server.uri();

    let (code, _, stderr) = run(
        &token_file,
        &uri,
        &["login", "--username", "a@b.com", "--password", "x"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(std::fs::read_to_string(&token_file).unwrap(), "tok-42");

    let (code, stdout, stderr) = run(&token_file, &uri, &["keys", "list"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("key-one") && stdout.contains("key-two"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_prints_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");
    let (code, _, stderr) = run(
        &token_file,
        &server.uri(),
        &["login", "--username", "a@b.com", "--password", "bad"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Invalid credentials"), "stderr: {stderr}");
    assert!(!token_file.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exercise_prints_raw_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/hello"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"message":"Hello"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    // No session: keys authenticate themselves.
    let dir = tempfile::tempdir().unwrap();
    let token_file = dir.path().join("token");

    let (code, stdout, stderr) = run(&token_file, &server.uri(), &["keys", "exercise", "k1"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains(r#"{"message":"Hello"}"#), "stdout: {stdout}");
}
