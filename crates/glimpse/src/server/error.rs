//! Mapping of analysis failures onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use glimpse_core::{AnalyzeError, ProviderError};
use serde_json::json;

/// Error returned by the `/analyze` handler.
#[derive(Debug)]
pub struct ApiError(pub AnalyzeError);

impl From<AnalyzeError> for ApiError {
    fn from(err: AnalyzeError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AnalyzeError::Input(_) => StatusCode::BAD_REQUEST,
            AnalyzeError::Provider(ProviderError::Refusal { .. }) => StatusCode::BAD_GATEWAY,
            AnalyzeError::Provider(ProviderError::CallFailed {
                status_code: Some(_),
                ..
            }) => StatusCode::BAD_GATEWAY,
            AnalyzeError::Provider(ProviderError::CallFailed { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
