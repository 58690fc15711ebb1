//! HTTP API tests: the router is served on an ephemeral port and driven
//! with reqwest, backed by the scripted fakes.

mod common;

use std::sync::atomic::Ordering;

use common::{harness, harness_with, test_config, Harness, CONVERSATIONAL_ANSWER};
use kira::prompts::DEFAULT_SYSTEM_PROMPT;
use serde_json::{json, Value};
use tempfile::TempDir;

async fn serve(h: &Harness) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = kira::server::router(h.assistant.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn create_session(client: &reqwest::Client, base: &str) -> String {
    let resp = client
        .post(format!("{}/sessions", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_version() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn new_session_carries_default_prompt() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/sessions", base))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["system_prompt"], DEFAULT_SYSTEM_PROMPT);
    assert!(uuid::Uuid::parse_str(body["id"].as_str().unwrap()).is_ok());
    assert!(chrono::DateTime::parse_from_rfc3339(body["created_at"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn chat_returns_reply_and_records_transcript() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/chat", base, id))
        .json(&json!({"message": "¿Qué es la Universidad de la Sabana?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reply"], CONVERSATIONAL_ANSWER);

    let body: Value = client
        .get(format!("{}/sessions/{}/messages", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], CONVERSATIONAL_ANSWER);
}

#[tokio::test]
async fn blank_message_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/chat", base, id))
        .json(&json!({"message": "  "}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/chat", base, id))
        .header("Content-Type", "application/json")
        .body("{\"msg\": 1}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unknown_and_invalid_session_ids() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!(
            "{}/sessions/550e8400-e29b-41d4-a716-446655440000/messages",
            base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = client
        .get(format!("{}/sessions/not-a-uuid/messages", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn upload_indexes_document() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!(
            "{}/sessions/{}/documents?filename=horario.csv",
            base, id
        ))
        .body("materia,horario\nCálculo,lunes 7am\nFísica,martes 9am\n")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["stored_as"], "horario.csv");
    assert_eq!(body["segments"], 2);
    assert_eq!(body["chunks"], 2);
    assert_eq!(body["indexed"], true);
    assert_eq!(body["message"], kira::prompts::UPLOAD_OK);
}

#[tokio::test]
async fn unsupported_upload_is_415() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!(
            "{}/sessions/{}/documents?filename=slides.pptx",
            base, id
        ))
        .body("PK")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 415);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unsupported_document");
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains(kira::prompts::UNSUPPORTED_FORMAT));
    assert!(message.contains("accepted: pdf, csv, txt, xlsx, docx"));
}

#[tokio::test]
async fn upload_requires_filename() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/documents", base, id))
        .body("hola")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.uploads.max_bytes = 16;
    let h = harness_with(config);
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .post(format!("{}/sessions/{}/documents?filename=big.txt", base, id))
        .body("x".repeat(64))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "payload_too_large");
}

#[tokio::test]
async fn model_failure_is_502() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;
    h.model.fail.store(true, Ordering::SeqCst);

    let resp = client
        .post(format!("{}/sessions/{}/chat", base, id))
        .json(&json!({"message": "Hola"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "llm_error");
}

#[tokio::test]
async fn system_prompt_roundtrip_and_clear() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .put(format!("{}/sessions/{}/system-prompt", base, id))
        .json(&json!({"system_prompt": "Responde en una frase."}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    client
        .post(format!("{}/sessions/{}/chat", base, id))
        .json(&json!({"message": "Hola"}))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{}/sessions/{}/clear", base, id))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], kira::prompts::HISTORY_CLEARED);

    let body: Value = client
        .get(format!("{}/sessions/{}/system-prompt", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["system_prompt"], "Responde en una frase.");

    let body: Value = client
        .get(format!("{}/sessions/{}/messages", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleted_session_is_gone() {
    let tmp = TempDir::new().unwrap();
    let h = harness(tmp.path());
    let base = serve(&h).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &base).await;

    let resp = client
        .delete(format!("{}/sessions/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    assert!(h.assistant.sessions().is_empty().await);

    let resp = client
        .delete(format!("{}/sessions/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}
