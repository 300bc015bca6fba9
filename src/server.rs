//! JSON HTTP server over the retrieval path.
//!
//! Lets several UI sessions share one process, and so one snapshot cache,
//! instead of each rescanning the reference folder.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/tools/context` | Assemble a context for a query |
//! | `POST` | `/tools/search` | Ranked relevant documents for a query |
//!
//! Requests may name a `root`; otherwise `[corpus].root` is used.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `internal` (500).

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use case_context_core::error::RetrievalError;
use case_context_core::models::{AssembledContext, ScoredDocument};

use crate::config::Config;
use crate::retrieve::Retriever;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    retriever: Arc<Retriever>,
}

/// Start the server on `[server].bind` and run until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        retriever: Arc::new(Retriever::from_config(config)?),
        config: Arc::new(config.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/tools/context", post(handle_context))
        .route("/tools/search", post(handle_search))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(
        bind = %bind_addr,
        root = %config.corpus.root.display(),
        "case context server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
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

impl From<RetrievalError> for AppError {
    fn from(err: RetrievalError) -> Self {
        bad_request(err.to_string())
    }
}

/// Run blocking retrieval work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, RetrievalError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| internal(format!("retrieval task failed: {}", e)))?
        .map_err(AppError::from)
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

// ============ POST /tools/context ============

#[derive(Deserialize)]
struct ContextRequest {
    query: String,
    #[serde(default)]
    budget: Option<usize>,
    #[serde(default)]
    root: Option<PathBuf>,
}

#[derive(Serialize)]
struct ContextResponse {
    root: PathBuf,
    #[serde(flatten)]
    context: AssembledContext,
}

async fn handle_context(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    let root = req.root.unwrap_or_else(|| state.config.corpus.root.clone());
    let budget = req.budget.unwrap_or(state.config.retrieval.budget);

    let retriever = Arc::clone(&state.retriever);
    let query_root = root.clone();
    let context =
        blocking(move || retriever.retrieve(&query_root, &req.query, budget)).await?;

    Ok(Json(ContextResponse { root, context }))
}

// ============ POST /tools/search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    root: Option<PathBuf>,
}

/// One ranked search hit.
#[derive(Serialize)]
pub struct SearchResultItem {
    pub path: String,
    pub category: String,
    pub score: f64,
    pub encoding: String,
    pub size: usize,
    pub snippet: String,
}

impl From<&ScoredDocument> for SearchResultItem {
    fn from(scored: &ScoredDocument) -> Self {
        let doc = &scored.document;
        Self {
            path: doc.path.clone(),
            category: doc.category.clone(),
            score: scored.score,
            encoding: doc.encoding.to_string(),
            size: doc.size,
            snippet: snippet(&doc.text, 160),
        }
    }
}

/// First `max_chars` characters of `text` with whitespace runs collapsed.
pub fn snippet(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let mut cut: String = collapsed.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

#[derive(Serialize)]
struct SearchResponse {
    root: PathBuf,
    results: Vec<SearchResultItem>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let root = req.root.unwrap_or_else(|| state.config.corpus.root.clone());
    let limit = req.limit.unwrap_or(state.config.retrieval.search_limit);
    if limit == 0 {
        return Err(bad_request("limit must be >= 1"));
    }

    let retriever = Arc::clone(&state.retriever);
    let query_root = root.clone();
    let hits = blocking(move || retriever.search(&query_root, &req.query, limit)).await?;

    Ok(Json(SearchResponse {
        root,
        results: hits.iter().map(SearchResultItem::from).collect(),
    }))
}
