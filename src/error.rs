use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::session::TransitionError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error("Server misconfiguration: {0}")]
    Configuration(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Failed to parse analysis: {0}")]
    Parse(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub fn no_images() -> Self {
        AnalysisError::Validation("No images provided".to_string())
    }

    pub fn missing_api_key() -> Self {
        AnalysisError::Configuration("Missing API key".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AnalysisError::Validation(_) | AnalysisError::Decode(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Transition(_) => StatusCode::CONFLICT,
            AnalysisError::Configuration(_)
            | AnalysisError::Backend(_)
            | AnalysisError::Parse(_)
            | AnalysisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AnalysisError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
