//! HTTP JSON API.
//!
//! Exposes the assistant's session operations so any front end (browser,
//! chat widget, script) can drive a conversation. Each session is
//! independent; the id returned by `POST /sessions` scopes every other call.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/sessions` | Create a session |
//! | `DELETE` | `/sessions/{id}` | Drop a session |
//! | `GET`  | `/sessions/{id}/messages` | Transcript |
//! | `POST` | `/sessions/{id}/chat` | `{ "message" }` → `{ "reply" }` |
//! | `POST` | `/sessions/{id}/documents?filename=` | Upload raw bytes, replace the index |
//! | `POST` | `/sessions/{id}/clear` | Clear transcript and memory |
//! | `GET`/`PUT` | `/sessions/{id}/system-prompt` | Read or replace the prompt |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be blank" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `payload_too_large` (413), `unsupported_document` (415),
//! `llm_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted for browser front ends.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, JsonRejection},
        DefaultBodyLimit, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use kira_core::models::Turn;

use crate::assistant::Assistant;
use crate::config::{Config, MAX_SESSION_IDLE_SECS};
use crate::error::{KiraError, LoadError};
use crate::ingest::IngestReport;
use crate::loader;
use crate::prompts;
use crate::session::Session;

#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
}

/// Build the router. Split from [`run_server`] so tests can serve it on an
/// ephemeral port.
pub fn router(assistant: Arc<Assistant>) -> Router {
    let body_limit = assistant.max_upload_bytes();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sessions", post(handle_create_session))
        .route("/sessions/{id}", delete(handle_delete_session))
        .route("/sessions/{id}/messages", get(handle_messages))
        .route("/sessions/{id}/chat", post(handle_chat))
        .route(
            "/sessions/{id}/documents",
            post(handle_upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/sessions/{id}/clear", post(handle_clear))
        .route(
            "/sessions/{id}/system-prompt",
            get(handle_get_prompt).put(handle_put_prompt),
        )
        .layer(cors)
        .with_state(AppState { assistant })
}

/// Serve the API on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config, assistant: Arc<Assistant>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    if config.server.session_idle_secs > 0 {
        spawn_session_sweeper(assistant.clone(), config.server.session_idle_secs);
    }
    let app = router(assistant);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Kira listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop sessions idle for longer than `idle_secs`.
fn spawn_session_sweeper(assistant: Arc<Assistant>, idle_secs: u64) {
    let period = std::time::Duration::from_secs(idle_secs.clamp(1, 60));
    let max_idle = chrono::Duration::seconds(idle_secs.min(MAX_SESSION_IDLE_SECS) as i64);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let cutoff = chrono::Utc::now() - max_idle;
            assistant.sessions().expire_idle_before(cutoff).await;
        }
    });
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn payload_too_large(max_bytes: usize) -> AppError {
    AppError::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        "payload_too_large",
        format!("upload exceeds the {}-byte limit", max_bytes),
    )
}

impl From<KiraError> for AppError {
    fn from(err: KiraError) -> Self {
        let message = err.to_string();
        match err {
            KiraError::InvalidRequest(_) | KiraError::Upload(_) => bad_request(message),
            KiraError::Load(LoadError::Unsupported(_)) => AppError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_document",
                format!(
                    "{} ({}; accepted: {})",
                    prompts::UNSUPPORTED_FORMAT,
                    message,
                    loader::accepted_formats()
                ),
            ),
            KiraError::Load(LoadError::Parse { .. }) | KiraError::Load(LoadError::Empty(_)) => {
                bad_request(message)
            }
            KiraError::UploadTooLarge(max) => payload_too_large(max),
            KiraError::SessionNotFound(_) => {
                AppError::new(StatusCode::NOT_FOUND, "not_found", message)
            }
            KiraError::Llm(_) => AppError::new(StatusCode::BAD_GATEWAY, "llm_error", message),
            KiraError::Load(LoadError::Io { .. }) | KiraError::Internal(_) => {
                tracing::error!(error = %message, "internal error");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

async fn lookup(state: &AppState, id: &str) -> Result<Arc<Session>, AppError> {
    let id = Uuid::parse_str(id).map_err(|_| bad_request(format!("invalid session id: {}", id)))?;
    Ok(state.assistant.sessions().get(id).await?)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Sessions ============

#[derive(Serialize)]
struct SessionResponse {
    id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    system_prompt: String,
}

async fn handle_create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session = state.assistant.create_session().await;
    let system_prompt = state.assistant.system_prompt(&session).await;
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            id: session.id(),
            created_at: session.created_at(),
            system_prompt,
        }),
    )
}

async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let session = lookup(&state, &id).await?;
    state.assistant.sessions().remove(session.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct MessagesResponse {
    messages: Vec<Turn>,
}

async fn handle_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessagesResponse>, AppError> {
    let session = lookup(&state, &id).await?;
    let messages = session.lock().await.transcript().to_vec();
    Ok(Json(MessagesResponse { messages }))
}

// ============ POST /sessions/{id}/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;
    let session = lookup(&state, &id).await?;
    let reply = state.assistant.chat(&session, &req.message).await?;
    Ok(Json(ChatResponse { reply }))
}

// ============ POST /sessions/{id}/documents ============

#[derive(Deserialize)]
struct UploadQuery {
    filename: Option<String>,
}

async fn handle_upload(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<IngestReport>, AppError> {
    let bytes = body.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            payload_too_large(state.assistant.max_upload_bytes())
        } else {
            bad_request(e.body_text())
        }
    })?;
    let filename = query
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| bad_request("filename query parameter is required"))?;
    let session = lookup(&state, &id).await?;
    let report = state.assistant.upload(&session, &filename, &bytes).await?;
    Ok(Json(report))
}

// ============ POST /sessions/{id}/clear ============

#[derive(Serialize)]
struct ClearResponse {
    message: String,
}

async fn handle_clear(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClearResponse>, AppError> {
    let session = lookup(&state, &id).await?;
    state.assistant.clear(&session).await;
    Ok(Json(ClearResponse {
        message: prompts::HISTORY_CLEARED.to_string(),
    }))
}

// ============ /sessions/{id}/system-prompt ============

#[derive(Serialize, Deserialize)]
struct PromptBody {
    system_prompt: String,
}

async fn handle_get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromptBody>, AppError> {
    let session = lookup(&state, &id).await?;
    let system_prompt = state.assistant.system_prompt(&session).await;
    Ok(Json(PromptBody { system_prompt }))
}

async fn handle_put_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<PromptBody>, JsonRejection>,
) -> Result<Json<PromptBody>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;
    let session = lookup(&state, &id).await?;
    state
        .assistant
        .set_system_prompt(&session, &req.system_prompt)
        .await;
    Ok(Json(PromptBody {
        system_prompt: req.system_prompt,
    }))
}
