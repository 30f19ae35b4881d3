//! CLI integration tests for the restlens command-line interface.
//!
//! Every test points `HOME` at a temporary directory so that credentials and
//! logs never touch the real user profile. Tests that need a server use a
//! local mock.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for the restlens binary with an isolated home directory.
fn restlens(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("restlens").unwrap();
    cmd.env("HOME", home)
        .env_remove("RESTLENS_SERVER")
        .env_remove("RUST_LOG");
    cmd
}

fn auth_file(home: &Path) -> std::path::PathBuf {
    home.join(".restlens").join("auth.json")
}

fn write_credentials(home: &Path, servers: serde_json::Value) {
    let file = auth_file(home);
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(file, json!({ "servers": servers }).to_string()).unwrap();
}

fn single_server(server: &str, token: &str) -> serde_json::Value {
    let mut servers = serde_json::Map::new();
    servers.insert(server.to_string(), json!({ "accessToken": token }));
    serde_json::Value::Object(servers)
}

fn write_spec(dir: &Path) -> std::path::PathBuf {
    let file = dir.join("openapi.yaml");
    std::fs::write(
        &file,
        "openapi: 3.0.0\ninfo:\n  title: Pets\n  version: '1.0'\npaths: {}\n",
    )
    .unwrap();
    file
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("REST Lens"));
}

#[test]
fn test_version_displays() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("restlens"));
}

#[test]
fn test_help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("eval"))
        .stdout(predicate::str::contains("violations"))
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("logout"));
}

#[test]
fn test_evaluate_alias() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .args(["evaluate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains("--poll"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_upload_requires_project() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .args(["upload", "openapi.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--project"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Status and Logout
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_status_when_not_authenticated() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not authenticated. Run: restlens auth"));
}

#[test]
fn test_status_hint_names_env_server() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .env("RESTLENS_SERVER", "http://lens.local:3000")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "restlens auth --server http://lens.local:3000",
        ));
}

#[test]
fn test_status_lists_stored_servers() {
    let home = TempDir::new().unwrap();
    write_credentials(
        home.path(),
        json!({
            "https://restlens.com": {"accessToken": "a"},
            "http://localhost:3000": {"accessToken": "b", "expiresAt": 1}
        }),
    );

    restlens(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Authenticated to: https://restlens.com"))
        .stdout(predicate::str::contains("Authenticated to: http://localhost:3000"))
        .stdout(predicate::str::contains("no expiry"))
        .stdout(predicate::str::contains("(expired)"));
}

#[test]
fn test_status_json() {
    let home = TempDir::new().unwrap();
    write_credentials(
        home.path(),
        json!({ "https://restlens.com": {"accessToken": "a", "refreshToken": "r"} }),
    );

    let output = restlens(home.path())
        .args(["--json", "status"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["servers"][0]["server"], "https://restlens.com");
    assert_eq!(value["servers"][0]["refreshable"], true);
}

#[test]
fn test_logout_without_credentials() {
    let home = TempDir::new().unwrap();
    restlens(home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out successfully."));
}

#[test]
fn test_logout_with_server_keeps_other_entries() {
    let home = TempDir::new().unwrap();
    write_credentials(
        home.path(),
        json!({
            "https://restlens.com": {"accessToken": "a"},
            "http://localhost:3000": {"accessToken": "b"}
        }),
    );

    restlens(home.path())
        .args(["--server", "http://localhost:3000", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out of http://localhost:3000."));

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(auth_file(home.path())).unwrap()).unwrap();
    assert_eq!(stored["servers"]["https://restlens.com"]["accessToken"], "a");
    assert!(stored["servers"].get("http://localhost:3000").is_none());
}

#[test]
fn test_logout_removes_file() {
    let home = TempDir::new().unwrap();
    write_credentials(home.path(), json!({ "https://restlens.com": {"accessToken": "a"} }));

    restlens(home.path()).arg("logout").assert().success();
    assert!(!auth_file(home.path()).exists());
}

// ─────────────────────────────────────────────────────────────────────────────
// Input Validation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_upload_rejects_bad_project() {
    let home = TempDir::new().unwrap();
    let spec = write_spec(home.path());
    restlens(home.path())
        .args(["upload", spec.to_str().unwrap(), "-p", "no-slash"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("org/name"));
}

#[test]
fn test_upload_rejects_malformed_spec() {
    let home = TempDir::new().unwrap();
    let spec = home.path().join("broken.yaml");
    std::fs::write(&spec, "openapi: [unclosed").unwrap();

    restlens(home.path())
        .args(["upload", spec.to_str().unwrap(), "-p", "acme/pets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid specification format"));
}

#[test]
fn test_upload_when_not_authenticated() {
    let home = TempDir::new().unwrap();
    let spec = write_spec(home.path());
    restlens(home.path())
        .args(["upload", spec.to_str().unwrap(), "-p", "acme/pets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Not authenticated with https://restlens.com",
        ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Against a mock server
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_eval_uploads_waits_and_prints_violations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/acme/pets/specifications"))
        .and(header("authorization", "Bearer stored-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "specification": {"id": "spec-9", "version": 2},
            "evaluation": {"status": "evaluating"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications/spec-9/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("data: {\"type\":\"status\",\"status\":\"done\"}\n\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications/spec-9/violations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "violations": [
                {"key": {"path": "/pets"}, "value": [
                    {"message": "Missing operationId", "severity": "error", "rule_id": 4}
                ]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let spec = write_spec(home.path());
    write_credentials(home.path(), single_server(&server.uri(), "stored-token"));

    restlens(home.path())
        .args(["--server", &server.uri(), "eval", spec.to_str().unwrap(), "-p", "acme/pets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uploaded. Specification ID: spec-9"))
        .stdout(predicate::str::contains("Evaluation complete!"))
        .stdout(predicate::str::contains("[Rule 4] /pets"))
        .stdout(predicate::str::contains("Summary: 1 errors, 0 warnings, 0 info"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_eval_reports_pending_when_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/projects/acme/pets/specifications"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "specification": {"id": "spec-9", "version": 2},
            "evaluation": {"status": "evaluating"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications/spec-9/stream"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications/spec-9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications/spec-9/violations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"violations": []})))
        .expect(0)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let spec = write_spec(home.path());
    write_credentials(home.path(), single_server(&server.uri(), "t"));

    restlens(home.path())
        .args(["--server", &server.uri(), "eval", spec.to_str().unwrap(), "-p", "acme/pets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Evaluation still in progress. Check back with:"))
        .stdout(predicate::str::contains("restlens violations -p acme/pets"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_violations_for_project_without_specifications() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"specifications": []})))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    write_credentials(home.path(), single_server(&server.uri(), "t"));

    restlens(home.path())
        .args(["--server", &server.uri(), "violations", "-p", "acme/pets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No specifications found for this project."))
        .stdout(predicate::str::contains("restlens upload <file> -p acme/pets"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_violations_passes_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "specifications": [
                {"id": "new", "version": 3, "evaluationStatus": "completed"},
                {"id": "old", "version": 2, "evaluationStatus": "completed"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/projects/acme/pets/specifications/new/violations"))
        .and(query_param("severity", "warning"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "violations": [], "totalViolations": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    write_credentials(home.path(), single_server(&server.uri(), "t"));

    restlens(home.path())
        .args([
            "--server",
            &server.uri(),
            "violations",
            "-p",
            "acme/pets",
            "--severity",
            "warning",
            "--limit",
            "5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Latest specification: v3 (new)"))
        .stdout(predicate::str::contains("No violations found!"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_projects_grouped_by_organization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [
                {"name": "pets", "description": "Pet store API", "organizationSlug": "acme"},
                {"name": "sandbox"}
            ]
        })))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    write_credentials(home.path(), single_server(&server.uri(), "t"));

    restlens(home.path())
        .args(["--server", &server.uri(), "projects"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/pets"))
        .stdout(predicate::str::contains("personal/sandbox"))
        .stdout(predicate::str::contains("Total: 2 project(s)"));
}
