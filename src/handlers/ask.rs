use axum::{
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::{
    error::{AppError, Result},
    handlers::AppState,
    models::llm::{AskDocRequest, AskDocResponse, LlmQuery},
    services::llm_service::{contract_text_for, extra_context_for},
};

/// Raw question endpoint. Bridge failures are reported through the status code.
pub async fn ask_v2(
    State(state): State<AppState>,
    body: std::result::Result<Json<LlmQuery>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(query) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let reply = state.llm.ask(query).await;
    if !reply.ok {
        return Err(AppError::Llm(reply.answer));
    }

    Ok((StatusCode::OK, Json(json!({ "ok": true, "answer": reply.answer }))))
}

/// Chat endpoint used by the UI. A well-formed question always gets a 200 so
/// the answer, or the failure message, can be shown as a chat bubble.
pub async fn ask_doc_ui(
    State(state): State<AppState>,
    body: std::result::Result<Json<AskDocRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let question = request.question.unwrap_or_default();
    if question.trim().is_empty() {
        return Err(AppError::BadRequest("Missing question.".to_string()));
    }

    let contract = match request.contract_id.as_ref().and_then(id_string) {
        Some(id) => state
            .store
            .find(&id)
            .await
            .map_err(AppError::StoreUnavailable)?,
        None => None,
    };

    let contract_text = contract.as_ref().map(contract_text_for).unwrap_or_default();
    let extra_context = extra_context_for(contract.as_ref());
    tracing::debug!(
        "Asking about contract {:?}: {}",
        contract.as_ref().map(|c| &c.id),
        extra_context
    );

    let reply = state
        .llm
        .ask(LlmQuery::new(question, contract_text, extra_context))
        .await;

    Ok((
        StatusCode::OK,
        Json(AskDocResponse {
            ok: reply.ok,
            answer: reply.answer,
            has_full_text: contract.as_ref().is_some_and(|c| c.has_full_text()),
            used_contract_id: contract.map(|c| c.id),
        }),
    ))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
