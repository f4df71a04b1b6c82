use axum::{
    extract::{Json, Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::{AppError, Result},
    handlers::AppState,
    models::contract::ContractInput,
};

/// Get all contracts handler
pub async fn list_contracts(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let contracts = state
        .store
        .list()
        .await
        .map_err(AppError::StoreUnavailable)?;

    Ok((StatusCode::OK, Json(json!({ "ok": true, "contracts": contracts }))))
}

/// Create or replace contract handler
pub async fn save_contract(
    State(state): State<AppState>,
    body: std::result::Result<Json<ContractInput>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let contract = state
        .store
        .upsert(input)
        .await
        .map_err(|e| AppError::store("Failed to save contract", e))?;

    Ok((StatusCode::OK, Json(json!({ "ok": true, "contract": contract }))))
}

/// Delete contract handler
pub async fn delete_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .store
        .delete(&id)
        .await
        .map_err(|e| AppError::store("Failed to delete contract", e))?;

    Ok((StatusCode::OK, Json(json!({ "ok": true }))))
}
