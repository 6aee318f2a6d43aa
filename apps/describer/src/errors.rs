use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::errors::PipelineError;
use crate::table::loader::LoadError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code, shared by HTTP responses and run reports.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Pipeline(e) => e.code(),
            AppError::Load(_) => "INVALID_CSV",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Pipeline(e) if e.is_structural() => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Pipeline(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            AppError::Load(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "The language model call failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
