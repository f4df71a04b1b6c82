use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Contract store unavailable")]
    StoreUnavailable(#[source] StoreError),

    #[error("{context}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Unexpected error contacting the LLM.")]
    Llm(String),

    #[error("Upstream unreachable")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    /// Wraps a failed store mutation. Validation failures stay client errors.
    pub fn store(context: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => AppError::BadRequest(msg),
            source => AppError::Store { context, source },
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Llm(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            AppError::BadRequest(_) => None,
            AppError::StoreUnavailable(source) | AppError::Store { source, .. } => {
                Some(source.to_string())
            }
            AppError::Llm(detail) | AppError::Upstream(detail) | AppError::Internal(detail) => {
                Some(detail.clone())
            }
        }
    }
}

// Convert AppError to an HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(?self);

        let body = Json(ErrorResponse {
            ok: false,
            error: self.to_string(),
            detail: self.detail(),
        });

        (self.status(), body).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub type Result<T> = std::result::Result<T, AppError>;
