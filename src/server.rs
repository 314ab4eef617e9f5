//! HTTP API server.
//!
//! Exposes document registration, listing, and group-scoped question
//! answering as a JSON API. Upload handling proper (multipart, quotas,
//! storage) lives outside this service: registration receives the path of
//! an already-persisted file plus its content type.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/groups/{group_id}/documents` | Register a stored file and queue its ingestion |
//! | `GET`  | `/groups/{group_id}/documents` | List the group's documents |
//! | `POST` | `/groups/{group_id}/ask` | Answer a question from the group's corpus |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `embedding_unavailable` (502),
//! `generation_failed` (502), `timeout` (504), `internal` (500). An answer of "no relevant information" is a
//! normal `200`, never an error.
//!
//! Registration returns `201` as soon as the document row exists and the
//! ingestion job is queued; ingestion outcome is observable via the
//! document's `status` in the listing, not via the registration response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::answer::AnswerSynthesizer;
use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::error::AskError;
use crate::extract;
use crate::generation;
use crate::ingest::{new_document, IngestionPipeline};
use crate::migrate;
use crate::retrieve::RetrievalEngine;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;
use crate::worker::{IngestJob, IngestWorker};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
    worker: Arc<IngestWorker>,
    engine: Arc<RetrievalEngine>,
    synthesizer: Arc<AnswerSynthesizer>,
}

/// Start the HTTP server on the configured bind address.
///
/// Wires the store, providers, pipeline, worker pool, retrieval engine,
/// and synthesizer, then serves until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
    let embedder: Arc<dyn embedding::EmbeddingProvider> =
        embedding::create_embedding_provider(&config.embedding)?.into();
    let generator: Arc<dyn generation::GenerativeProvider> =
        generation::create_generative_provider(&config.generation)?.into();

    let pipeline = Arc::new(IngestionPipeline::new(
        store.clone(),
        embedder.clone(),
        config.chunking.max_chars,
        config.chunking.overlap_chars,
    ));
    let worker = Arc::new(IngestWorker::spawn(pipeline, config.worker.workers));

    let engine = Arc::new(RetrievalEngine::new(
        store.clone(),
        embedder,
        config.retrieval.top_k,
    ));
    let synthesizer = Arc::new(AnswerSynthesizer::new(generator));

    let state = AppState {
        store,
        worker,
        engine,
        synthesizer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route(
            "/groups/{group_id}/documents",
            post(handle_register_document).get(handle_list_documents),
        )
        .route("/groups/{group_id}/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = config.server.bind.clone();
    info!("docket server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map question-answering failures onto the error contract. The
/// "no relevant information" outcome never reaches this function; it is a
/// successful answer.
fn ask_error(err: AskError) -> AppError {
    match &err {
        AskError::EmptyQuestion => bad_request(err.to_string()),
        AskError::EmbeddingUnavailable(_) => AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "embedding_unavailable".to_string(),
            message: err.to_string(),
        },
        AskError::Generation { .. } => AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "generation_failed".to_string(),
            message: err.to_string(),
        },
        AskError::Timeout(_) => AppError {
            status: StatusCode::GATEWAY_TIMEOUT,
            code: "timeout".to_string(),
            message: err.to_string(),
        },
        AskError::Store(_) => internal(err.to_string()),
    }
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

// ============ POST /groups/{group_id}/documents ============

#[derive(Deserialize)]
struct RegisterRequest {
    /// Path of the already-persisted file.
    path: String,
    content_type: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
}

#[derive(Serialize)]
struct RegisterResponse {
    document_id: String,
    filename: String,
    message: String,
}

/// Create the document row and queue ingestion. Fire-and-forget: the
/// response does not wait for (or report) pipeline completion.
async fn handle_register_document(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if req.path.trim().is_empty() {
        return Err(bad_request("path must not be empty"));
    }
    if !extract::is_supported(&req.content_type) {
        return Err(bad_request(format!(
            "unsupported content type: {}",
            req.content_type
        )));
    }

    let filepath = std::path::PathBuf::from(&req.path);
    if !filepath.is_file() {
        return Err(bad_request(format!("no such file: {}", req.path)));
    }

    let filename = req.filename.unwrap_or_else(|| {
        filepath
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string()
    });
    let uploader = req.uploader.unwrap_or_else(|| "api".to_string());

    let doc = new_document(&group_id, &uploader, &filename, &req.path, &req.content_type);
    state
        .store
        .create_document(&doc)
        .await
        .map_err(|e| internal(e.to_string()))?;

    state
        .worker
        .submit(IngestJob {
            document_id: doc.id.clone(),
            filepath,
            content_type: req.content_type,
        })
        .map_err(|e| internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            document_id: doc.id,
            filename,
            message: "document registered, ingestion started".to_string(),
        }),
    ))
}

// ============ GET /groups/{group_id}/documents ============

#[derive(Serialize)]
struct DocumentItem {
    id: String,
    filename: String,
    content_type: String,
    status: String,
    created_at: i64,
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentItem>,
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let docs = state
        .store
        .list_documents(&group_id)
        .await
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(DocumentListResponse {
        documents: docs
            .into_iter()
            .map(|d| DocumentItem {
                id: d.id,
                filename: d.filename,
                content_type: d.content_type,
                status: d.status.as_str().to_string(),
                created_at: d.created_at,
            })
            .collect(),
    }))
}

// ============ POST /groups/{group_id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(ask_error(AskError::EmptyQuestion));
    }

    let chunks = state
        .engine
        .retrieve(&group_id, &req.question, state.engine.top_k())
        .await
        .map_err(ask_error)?;

    let answer = state
        .synthesizer
        .synthesize(&req.question, &chunks)
        .await
        .map_err(ask_error)?;

    Ok(Json(AskResponse { answer }))
}
