//! Route handlers.

use axum::extract::State;
use axum::http::{Extensions, HeaderMap};
use axum::Json;
use glimpse_core::{AnalysisRequest, AnalysisResponse};
use serde_json::{json, Value};

use super::context::request_context;
use super::{ApiError, AppState};

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": glimpse_core::VERSION,
    }))
}

/// `POST /analyze`
pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let context = request_context(&headers, &extensions);
    tracing::info!(
        machine_id = %request.machine_id,
        client_ip = %context.client_ip,
        "Analyze request received"
    );

    match state.analyzer.analyze(request, context).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            let err = ApiError::from(e);
            tracing::warn!(status = %err.status(), error = %err.0, "Analyze request failed");
            Err(err)
        }
    }
}
