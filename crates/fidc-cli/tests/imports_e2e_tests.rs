//! End-to-end tests for the `fidc imports` commands
//!
//! Each test runs the real binary against a wiremock server, with the config
//! file pointed at a temporary directory.

use assert_cmd::Command;
use fidc_common::fingerprint::fingerprint_bytes;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_string_contains, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

/// Logging overrides read by the binary at startup
const LOG_VARS: &[&str] = &[
    "LOG_LEVEL",
    "LOG_OUTPUT",
    "LOG_FORMAT",
    "LOG_DIR",
    "LOG_FILE_PREFIX",
    "LOG_FILTER",
    "LOG_INCLUDE_LOCATION",
    "LOG_INCLUDE_TARGETS",
];

/// Binary isolated from the user's config, logging setup and .env
fn fidc(dir: &TempDir, server: &MockServer) -> Command {
    let mut cmd = Command::cargo_bin("fidc").unwrap();
    for var in LOG_VARS {
        cmd.env_remove(var);
    }
    cmd.current_dir(dir.path())
        .env("FIDC_CONFIG", dir.path().join("config.toml"))
        .env_remove("FIDC_SERVER_URL")
        .arg("--server-url")
        .arg(server.uri());
    cmd
}

fn job_json(id: &str, status: &str, tentativas: u32) -> serde_json::Value {
    let terminal = status.starts_with("FINALIZADO");
    let mut events = vec![json!({
        "id": format!("{id}-0"),
        "status": "PROCESSANDO",
        "message": "Arquivo recebido",
        "createdAt": "2024-03-01T10:00:00Z"
    })];
    if terminal {
        events.push(json!({
            "id": format!("{id}-1"),
            "status": status,
            "message": null,
            "createdAt": "2024-03-01T10:05:00Z"
        }));
    }

    json!({
        "id": id,
        "fidcId": "F1",
        "origem": "Cnab",
        "fileName": "lote.rem",
        "fileHash": fingerprint_bytes(b"01REMESSA"),
        "status": status,
        "errorSummary": if status == "FINALIZADO_FALHA" { json!("Layout inválido") } else { json!(null) },
        "ultimoCodigoFalha": if status == "FINALIZADO_FALHA" { json!("E042") } else { json!(null) },
        "tentativas": tentativas,
        "createdAt": "2024-03-01T10:00:00Z",
        "completedAt": if terminal { json!("2024-03-01T10:05:00Z") } else { json!(null) },
        "events": events
    })
}

fn page_json(items: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "items": items,
        "page": 1,
        "pageSize": 20,
        "totalItems": items.len(),
        "totalPages": 1
    })
}

#[tokio::test]
async fn test_submit_without_fund_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/importacoes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "importacaoId": "x" })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lote.rem"), b"01REMESSA").unwrap();

    fidc(&dir, &server)
        .args(["imports", "submit", "lote.rem"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fidc-id"));
}

#[tokio::test]
async fn test_submit_sends_fingerprint_and_prints_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/importacoes"))
        .and(body_string_contains(fingerprint_bytes(b"01REMESSA").as_str()))
        .and(body_string_contains("filename=\"lote.rem\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "importacaoId": "imp-42" })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lote.rem"), b"01REMESSA").unwrap();

    fidc(&dir, &server)
        .args(["imports", "submit", "lote.rem", "--fidc-id", "F1", "--origem", "Cnab"])
        .assert()
        .success()
        .stdout(predicate::str::contains("imp-42"));
}

#[tokio::test]
async fn test_submit_unreadable_file_fails_before_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["imports", "submit", "missing.rem", "--fidc-id", "F1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot read file"));
}

#[tokio::test]
async fn test_submit_rejection_shows_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/importacoes"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "FIDC não encontrado" })),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lote.rem"), b"01REMESSA").unwrap();

    fidc(&dir, &server)
        .args(["imports", "submit", "lote.rem", "--fidc-id", "F9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FIDC não encontrado"));
}

#[tokio::test]
async fn test_list_table_format() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes"))
        .and(query_param("page", "1"))
        .and(query_param("pageSize", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(vec![
            job_json("imp-1", "FINALIZADO_SUCESSO", 1),
            job_json("imp-2", "FINALIZADO_FALHA", 1),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["imports", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("imp-1"))
        .stdout(predicate::str::contains("FINALIZADO_FALHA"))
        .stdout(predicate::str::contains("Page 1/1"));
}

#[tokio::test]
async fn test_list_json_format() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(vec![job_json("imp-1", "FINALIZADO_SUCESSO", 1)])),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    let output = fidc(&dir, &server)
        .args(["imports", "list", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let page: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["items"][0]["id"], "imp-1");
    assert_eq!(page["totalItems"], 1);
    // Console logging only; nothing lands in the working directory
    assert!(!dir.path().join("logs").exists());
}

#[tokio::test]
async fn test_list_watch_stops_when_everything_finishes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(vec![job_json("imp-1", "PROCESSANDO", 1)])),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(vec![job_json("imp-1", "FINALIZADO_SUCESSO", 1)])),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .env("FIDC_POLL_INTERVAL_SECS", "1")
        .args(["imports", "list", "--watch"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("PROCESSANDO"))
        .stdout(predicate::str::contains("FINALIZADO_SUCESSO"));

    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_server_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Banco indisponível" })),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["imports", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Banco indisponível"));
}

#[tokio::test]
async fn test_show_renders_timeline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes/imp-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("imp-2", "FINALIZADO_FALHA", 1)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["imports", "show", "imp-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Arquivo recebido"))
        .stdout(predicate::str::contains("E042"))
        .stdout(predicate::str::contains("Events"));
}

#[tokio::test]
async fn test_show_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes/ghost"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["imports", "show", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[tokio::test]
async fn test_show_verify_matching_and_mismatching_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes/imp-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("imp-1", "FINALIZADO_SUCESSO", 1)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("same.rem"), b"01REMESSA").unwrap();
    fs::write(dir.path().join("other.rem"), b"01REMESSA-EDITADA").unwrap();

    fidc(&dir, &server)
        .args(["imports", "show", "imp-1", "--verify", "same.rem"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matches"));

    fidc(&dir, &server)
        .args(["imports", "show", "imp-1", "--verify", "other.rem"])
        .assert()
        .failure();
}

#[tokio::test]
async fn test_reprocess_running_import_needs_force() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes/imp-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("imp-1", "PROCESSANDO", 1)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/importacoes/imp-1/reprocessar"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["imports", "reprocess", "imp-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[tokio::test]
async fn test_reprocess_failed_import_shows_new_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes/imp-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("imp-2", "FINALIZADO_FALHA", 1)),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/importacoes/imp-2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(job_json("imp-2", "PROCESSANDO", 2)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/importacoes/imp-2/reprocessar"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["imports", "reprocess", "imp-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reprocess requested for"))
        .stdout(predicate::str::contains("attempts: 1 → 2"));
}

#[tokio::test]
async fn test_config_set_then_get() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    fidc(&dir, &server)
        .args(["config", "set", "page_size", "50"])
        .assert()
        .success();

    fidc(&dir, &server)
        .env_remove("FIDC_PAGE_SIZE")
        .args(["config", "get", "page_size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("50"));

    assert!(dir.path().join("config.toml").exists());
}
