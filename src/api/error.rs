use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::errors::AnalysisError;

const INTERNAL_ERROR_CODE: u32 = 1000;

#[derive(Debug)]
pub struct ErrorResponse {
    pub status: StatusCode,
    pub code: u32,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, code: u32, message: String) -> Self {
        Self { status, code, message }
    }

    pub fn internal(message: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_CODE, message)
    }
}

impl From<AnalysisError> for ErrorResponse {
    fn from(err: AnalysisError) -> Self {
        let status = match &err {
            AnalysisError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            AnalysisError::Retrieval(_) => StatusCode::BAD_GATEWAY,
            AnalysisError::Invariant(_) | AnalysisError::Render(_) | AnalysisError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            error!(error = %err, "Analysis request failed");
        }
        Self::new(status, err.code(), err.to_string())
    }
}

// Undecodable bodies share the invalid-parameters contract
impl From<JsonRejection> for ErrorResponse {
    fn from(rejection: JsonRejection) -> Self {
        AnalysisError::InvalidParameters(rejection.body_text()).into()
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({
                "error_code": self.code,
                "message": self.message
            })),
        )
            .into_response()
    }
}
