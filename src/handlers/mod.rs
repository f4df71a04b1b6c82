use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{db::ContractStore, services::AnalysisService};

pub mod ask;
pub mod contracts;

/// Largest request body the server accepts (uploaded contract text included)
pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ContractStore>,
    pub llm: Arc<dyn AnalysisService>,
}

impl AppState {
    pub fn new(store: Arc<ContractStore>, llm: Arc<dyn AnalysisService>) -> Self {
        Self { store, llm }
    }
}

/// Builds the application server: JSON API plus the static UI, with
/// `index.html` answering every path nothing else claims.
pub fn router(state: AppState, public_dir: &Path) -> Router {
    let ui = ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join("index.html")));

    Router::new()
        .route("/health", get(|| async { Json(json!({ "ok": true })) }))
        .route(
            "/api/contracts",
            get(contracts::list_contracts).post(contracts::save_contract),
        )
        .route("/api/contracts/{id}", delete(contracts::delete_contract))
        .route("/api/llm/ask-v2", post(ask::ask_v2))
        .route("/ask-doc-ui", post(ask::ask_doc_ui))
        .fallback_service(ui)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
