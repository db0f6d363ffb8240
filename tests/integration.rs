//! End-to-end tests against an in-process mock of the RAG server.
//!
//! The mock speaks the same contract as the real service: `GET /health`,
//! multipart `POST /api/indexing/pdf`, and JSON `POST /api/retrieval/query`.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rag_assistant::backend::{HttpBackend, RagBackend};
use rag_assistant::config::Config;
use rag_assistant::error::ClientError;
use rag_assistant::health::HealthStatus;
use rag_assistant::ingest::{ItemState, PendingFile};
use rag_assistant::progress::NoProgress;
use rag_assistant::session::{Session, Workflow};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ─── Mock server ────────────────────────────────────────────────────

async fn index_pdf(body: Bytes) -> (StatusCode, Json<Value>) {
    let text = String::from_utf8_lossy(&body);
    if !text.contains("name=\"pdf\"") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No PDF file uploaded" })),
        );
    }
    if text.contains("CORRUPT") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "corrupt file" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "data": { "documentCount": 3, "collectionName": "pdf_collection" } })),
    )
}

async fn query(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let options = &body["options"];
    if options["retrievalLimit"] != 5 || options["model"] != "gpt-4" || options["maxTokens"] != 1000
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": format!("unexpected options: {}", options) })),
        );
    }

    match body["query"].as_str().unwrap_or_default() {
        "boom" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "model overloaded" })),
        ),
        "garbage" => (StatusCode::OK, Json(json!({ "unexpected": true }))),
        _ => (
            StatusCode::OK,
            Json(json!({
                "data": {
                    "response": "Refunds are...",
                    "retrieval": { "documentsFound": 2 },
                    "context": { "sources": ["policy.pdf"] },
                    "performance": { "totalTime": "120ms" }
                }
            })),
        ),
    }
}

async fn spawn_mock_server() -> String {
    let app = Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/indexing/pdf", post(index_pdf))
        .route("/api/retrieval/query", post(query));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn test_config(base_url: &str) -> Config {
    let mut cfg = Config::minimal();
    cfg.server.base_url = base_url.to_string();
    cfg.server.health_timeout_secs = 2;
    cfg.ingest.progress_interval_ms = 5;
    cfg.session.transition_delay_ms = 50;
    cfg.session.paste_delay_ms = 0;
    cfg
}

fn http_backend(cfg: &Config) -> Arc<dyn RagBackend> {
    Arc::new(HttpBackend::new(&cfg.server).unwrap())
}

// ─── Library against HTTP ───────────────────────────────────────────

#[tokio::test]
async fn test_health_probe_connected() {
    let url = spawn_mock_server().await;
    let cfg = test_config(&url);
    let session = Session::new(&cfg, http_backend(&cfg));

    assert_eq!(session.health(), HealthStatus::Unknown);
    assert_eq!(session.check_connection().await, HealthStatus::Connected);
    assert_eq!(session.health(), HealthStatus::Connected);
}

#[tokio::test]
async fn test_health_probe_unreachable_never_errors() {
    let cfg = test_config(&format!("http://127.0.0.1:{}", find_free_port()));
    let session = Session::new(&cfg, http_backend(&cfg));

    assert_eq!(session.check_connection().await, HealthStatus::Disconnected);
    // Retrying is idempotent.
    assert_eq!(session.check_connection().await, HealthStatus::Disconnected);
}

#[tokio::test]
async fn test_mixed_batch_over_http() {
    let url = spawn_mock_server().await;
    let cfg = test_config(&url);
    let mut session = Session::new(&cfg, http_backend(&cfg));
    session.check_connection().await;

    session.enqueue_files(vec![
        PendingFile::from_bytes("good.pdf", b"%PDF-1.4 fine".to_vec()),
        PendingFile::from_bytes("bad.pdf", b"%PDF-1.4 CORRUPT".to_vec()),
    ]);
    let mut workflow = session.subscribe_workflow();

    let report = session.index_files(&NoProgress).await.unwrap();

    let items = session.pipeline().items();
    assert_eq!(items[0].state(), ItemState::Success);
    assert_eq!(items[0].progress(), 100);
    assert_eq!(items[1].state(), ItemState::Error);
    assert_eq!(items[1].progress(), 0);
    assert_eq!(items[1].error(), Some("corrupt file"));
    assert_eq!((report.succeeded(), report.failed()), (1, 1));
    assert_eq!(
        session.status(),
        "All files processed: 1 succeeded, 1 failed"
    );

    tokio::time::timeout(Duration::from_secs(2), workflow.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.workflow(), Workflow::Chat);
}

#[tokio::test]
async fn test_ask_refund_policy_over_http() {
    let url = spawn_mock_server().await;
    let cfg = test_config(&url);
    let session = Session::new(&cfg, http_backend(&cfg));
    session.check_connection().await;

    let reply = session.ask("What is the refund policy?").await.unwrap();
    assert_eq!(reply.content, "Refunds are...");

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert!(transcript[0].is_user());
    assert_eq!(transcript[0].content, "What is the refund policy?");
    assert!(transcript[1].is_assistant());
    let meta = transcript[1].metadata().unwrap();
    assert_eq!(meta.documents_found, 2);
    assert_eq!(meta.sources, vec!["policy.pdf".to_string()]);
    assert_eq!(meta.processing_time, "120ms");
}

#[tokio::test]
async fn test_query_errors_become_transcript_entries() {
    let url = spawn_mock_server().await;
    let cfg = test_config(&url);
    let session = Session::new(&cfg, http_backend(&cfg));
    session.check_connection().await;

    let err = session.ask("boom").await.unwrap_err();
    assert!(matches!(err, ClientError::Query(ref m) if m == "model overloaded"));

    let err = session.ask("garbage").await.unwrap_err();
    assert!(err.to_string().contains("malformed response"));

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript[1].content, "Error: model overloaded");
    assert!(transcript[3].is_error());

    // The conversation is still usable afterwards.
    session.ask("What is the refund policy?").await.unwrap();
    assert_eq!(session.transcript().len(), 6);
}

#[tokio::test]
async fn test_paste_requires_title() {
    let url = spawn_mock_server().await;
    let cfg = test_config(&url);
    let mut session = Session::new(&cfg, http_backend(&cfg));
    session.check_connection().await;

    let err = session.submit_text("", "some text").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(session.workflow(), Workflow::IngestFile);
    assert!(!session.has_pending_switch());
}

// ─── CLI binary ─────────────────────────────────────────────────────

fn write_config(dir: &Path, base_url: &str) -> std::path::PathBuf {
    let path = dir.join("rag.toml");
    fs::write(
        &path,
        format!(
            r#"[server]
base_url = "{}"
health_timeout_secs = 2

[ingest]
progress_interval_ms = 5

[session]
transition_delay_ms = 0
paste_delay_ms = 0
"#,
            base_url
        ),
    )
    .unwrap();
    path
}

async fn run_rag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rag"));
    cmd.arg("--config").arg(config_path).args(args);
    let output: Output = tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .expect("failed to run rag binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cli_health() {
    let url = spawn_mock_server().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), &url);

    let (stdout, stderr, success) = run_rag(&config_path, &["health"]).await;
    assert!(success, "health failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Connected"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cli_health_unreachable_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(
        tmp.path(),
        &format!("http://127.0.0.1:{}", find_free_port()),
    );

    let (stdout, _stderr, success) = run_rag(&config_path, &["health"]).await;
    assert!(!success);
    assert!(stdout.contains("Disconnected"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cli_ask_json() {
    let url = spawn_mock_server().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), &url);

    let (stdout, stderr, success) =
        run_rag(&config_path, &["ask", "What is the refund policy?", "--json"]).await;
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);

    let entries: Vec<Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["type"], "user");
    assert_eq!(entries[1]["type"], "assistant");
    assert_eq!(entries[1]["content"], "Refunds are...");
    assert_eq!(entries[1]["metadata"]["documents_found"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cli_upload_reports_per_item_outcome() {
    let url = spawn_mock_server().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), &url);

    let good = tmp.path().join("good.pdf");
    let bad = tmp.path().join("bad.pdf");
    fs::write(&good, b"%PDF-1.4 fine").unwrap();
    fs::write(&bad, b"%PDF-1.4 CORRUPT").unwrap();

    let (stdout, stderr, success) = run_rag(
        &config_path,
        &[
            "upload",
            good.to_str().unwrap(),
            bad.to_str().unwrap(),
            "--progress",
            "off",
            "--json",
        ],
    )
    .await;

    assert!(!success, "a failed item should fail the command");
    assert!(stderr.contains("1 of 2 file(s) failed to index"));

    let items: Vec<Value> = serde_json::from_str(&stdout).unwrap();
    assert_eq!(items[0]["name"], "good.pdf");
    assert_eq!(items[0]["state"], "success");
    assert_eq!(items[0]["progress"], 100);
    assert_eq!(items[1]["state"], "error");
    assert_eq!(items[1]["progress"], 0);
    assert_eq!(items[1]["error"], "corrupt file");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cli_paste() {
    let url = spawn_mock_server().await;
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), &url);

    let (stdout, stderr, success) = run_rag(
        &config_path,
        &["paste", "--title", "Notes", "--content", "Quarterly refunds went down."],
    )
    .await;
    assert!(success, "paste failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Successfully indexed pasted content"));
    assert!(stdout.contains("preview: Quarterly refunds went down...."));

    let (_, stderr, success) =
        run_rag(&config_path, &["paste", "--title", "  ", "--content", "x"]).await;
    assert!(!success);
    assert!(stderr.contains("Please provide both title and content"));
}
