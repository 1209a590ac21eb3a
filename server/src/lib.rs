use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fulltext_core::{DocId, Error as IndexError, IndexStats, PostingsList, Querier, SharedIndex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod store;

use store::DocumentStore;

/// Indexed at startup with `--seed-demo`.
pub const DEMO_DOCS: [&str; 4] = [
    "new home sales top forecasts",
    "home sales rise in july",
    "increase in home sales in july",
    "july new home sales rise",
];

#[derive(Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub frequency: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<u32>,
    pub source: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct IndexResponse {
    pub doc_id: DocId,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<SharedIndex>,
    pub store: Arc<DocumentStore>,
}

impl AppState {
    pub fn new(store: DocumentStore) -> Self {
        Self { index: Arc::new(SharedIndex::new()), store: Arc::new(store) }
    }

    /// Index `bytes` and keep them in the store under the new doc id.
    pub fn add_document(&self, bytes: &[u8]) -> Result<DocId> {
        let doc_id = self.index.index_document(bytes)?;
        self.store
            .put(doc_id, bytes)
            .with_context(|| format!("document {doc_id} indexed but not stored"))?;
        Ok(doc_id)
    }

    pub fn seed_demo(&self) -> Result<()> {
        for doc in DEMO_DOCS {
            let doc_id = self.add_document(doc.as_bytes())?;
            tracing::info!(doc_id, doc, "seeded demo document");
        }
        Ok(())
    }
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, msg: impl ToString) -> ApiError {
    (status, Json(serde_json::json!({ "error": msg.to_string() })))
}

fn index_error(err: IndexError) -> ApiError {
    match err {
        IndexError::TokenNotFound(_) => api_error(StatusCode::NOT_FOUND, err),
        IndexError::NoTokensProvided => api_error(StatusCode::BAD_REQUEST, err),
        _ => {
            tracing::error!(error = %err, "index failure");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, err)
        }
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = ?err, "request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
}

pub fn build_app<P: AsRef<std::path::Path>>(store_dir: P) -> Result<Router> {
    let store = DocumentStore::open(store_dir)?;
    Ok(router(AppState::new(store)))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/", post(index_handler))
        .route("/doc", post(index_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/postings/:token", get(postings_handler))
        .route("/intersect", get(intersect_handler))
        .route("/search", get(search_handler))
        .route("/phrase", get(phrase_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// CORS_ALLOW_ORIGIN holds comma-separated origins. Any origin when unset or unparsable.
fn cors_layer() -> CorsLayer {
    let any = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                any
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => any,
    }
}

pub async fn index_handler(State(state): State<AppState>, body: Bytes) -> Result<Json<IndexResponse>, ApiError> {
    let doc_id = state.index.index_document(&body[..]).map_err(index_error)?;
    if let Err(err) = state.store.put(doc_id, &body) {
        // The document is already searchable; tell the caller which id lacks its bytes.
        tracing::error!(doc_id, error = ?err, "document indexed but not stored");
        let body = serde_json::json!({ "error": format!("{err:#}"), "doc_id": doc_id });
        return Err((StatusCode::INTERNAL_SERVER_ERROR, Json(body)));
    }
    tracing::info!(doc_id, bytes = body.len(), "indexed document");
    Ok(Json(IndexResponse { doc_id }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    match state.store.get(doc_id).map_err(internal)? {
        Some(bytes) => Ok(Json(serde_json::json!({
            "doc_id": doc_id,
            "text": String::from_utf8_lossy(&bytes),
        }))),
        None => Err(api_error(StatusCode::NOT_FOUND, format!("document {doc_id} not found"))),
    }
}

pub async fn postings_handler(State(state): State<AppState>, Path(token): Path<String>) -> Result<Json<PostingsList>, ApiError> {
    state.index.postings(&token).map(Json).map_err(index_error)
}

/// Tokens for `/intersect`. Each `tokens=` value is split on commas, so a token
/// that itself holds a comma (`$1,000`) must be sent as a verbatim `token=`
/// value instead. Both keys may repeat and are combined in order.
pub fn intersect_tokens(params: &[(String, String)]) -> Vec<&str> {
    let mut tokens = Vec::new();
    for (key, value) in params {
        match key.as_str() {
            "tokens" => tokens.extend(value.split(',').map(str::trim).filter(|t| !t.is_empty())),
            "token" if !value.trim().is_empty() => tokens.push(value.trim()),
            _ => {}
        }
    }
    tokens
}

pub async fn intersect_handler(State(state): State<AppState>, Query(params): Query<Vec<(String, String)>>) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let tokens = intersect_tokens(&params);
    let hits = state.index.intersection(&tokens).map_err(index_error)?;
    hydrate(&state, tokens.join(","), start, hits)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let hits = state.index.boolean(&params.q).map_err(index_error)?;
    hydrate(&state, params.q, start, hits)
}

pub async fn phrase_handler(State(state): State<AppState>, Query(params): Query<QueryParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = Instant::now();
    let hits = state.index.phrase(&params.q).map_err(index_error)?;
    hydrate(&state, params.q, start, hits)
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.index.stats())
}

/// Attach stored document text to each hit.
fn hydrate(state: &AppState, query: String, start: Instant, hits: PostingsList) -> Result<Json<SearchResponse>, ApiError> {
    let mut results = Vec::with_capacity(hits.len());
    for p in hits {
        let source = state
            .store
            .get(p.doc_id)
            .map_err(internal)?
            .map(|b| String::from_utf8_lossy(&b).into_owned());
        results.push(SearchHit { doc_id: p.doc_id, frequency: p.frequency, positions: p.positions, source });
    }
    Ok(Json(SearchResponse { query, took_s: start.elapsed().as_secs_f64(), total_hits: results.len(), results }))
}
