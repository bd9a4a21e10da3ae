//! HTTP surface: `POST /analyze` and `GET /`.
//!
//! The router owns no logic beyond extraction and status mapping; every
//! request is handed to the shared [`Analyzer`].

mod context;
mod error;
mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use glimpse_core::config::ServerConfig;
use glimpse_core::Analyzer;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
}

/// Build the application router.
pub fn router(analyzer: Arc<Analyzer>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/analyze", post(handlers::analyze))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { analyzer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::header::{self, HeaderValue};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use base64::Engine;
    use glimpse_core::llm::LlmRequest;
    use glimpse_core::{
        AnalysisRecord, AnalysisSink, Config, FinishReason, LlmProvider, PersistContext,
        PersistOutcome, PersistStatus, ProviderError,
    };
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        result: Result<AnalysisRecord, ProviderError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "gpt-4o"
        }

        async fn analyze(&self, _request: &LlmRequest) -> Result<AnalysisRecord, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    struct StubSink {
        status: PersistStatus,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisSink for StubSink {
        async fn persist(&self, _record: &AnalysisRecord, _ctx: &PersistContext) -> PersistOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            PersistOutcome {
                status: self.status,
                message: "stubbed".into(),
            }
        }
    }

    struct Harness {
        server: TestServer,
        provider: Arc<StubProvider>,
        sink: Arc<StubSink>,
    }

    fn harness_with(
        result: Result<AnalysisRecord, ProviderError>,
        status: PersistStatus,
        server_config: ServerConfig,
    ) -> Harness {
        let provider = Arc::new(StubProvider {
            result,
            calls: AtomicUsize::new(0),
        });
        let sink = Arc::new(StubSink {
            status,
            calls: AtomicUsize::new(0),
        });
        let analyzer = Analyzer::new(&Config::default(), provider.clone(), sink.clone());
        let app = router(Arc::new(analyzer), &server_config);
        Harness {
            server: TestServer::new(app).unwrap(),
            provider,
            sink,
        }
    }

    fn harness(result: Result<AnalysisRecord, ProviderError>, status: PersistStatus) -> Harness {
        harness_with(result, status, ServerConfig::default())
    }

    fn record() -> AnalysisRecord {
        AnalysisRecord {
            content: "no person detected".into(),
            model: "gpt-4o".into(),
            prompt_tokens: 50,
            completion_tokens: 5,
            total_tokens: 55,
            finish_reason: FinishReason::Stop,
        }
    }

    fn jpeg_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(1, 1));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Jpeg).unwrap();
        buf.into_inner()
    }

    fn payload(image: &str) -> Value {
        json!({
            "image": image,
            "metadata": {"param1": "value1"},
            "machine_id": "fridge_002",
            "camera_id": ["cam_001"]
        })
    }

    #[tokio::test]
    async fn test_root_reports_status() {
        let h = harness(Ok(record()), PersistStatus::Success);
        let response = h.server.get("/").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], glimpse_core::VERSION);
    }

    #[tokio::test]
    async fn test_analyze_returns_record_and_request_echo() {
        let h = harness(Ok(record()), PersistStatus::Success);
        let jpeg = jpeg_bytes();
        let image = base64::engine::general_purpose::STANDARD.encode(&jpeg);

        let response = h
            .server
            .post("/analyze")
            .add_header(header::USER_AGENT, HeaderValue::from_static("glimpse-test/1.0"))
            .json(&payload(&image))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Image decoded and request captured");
        assert_eq!(body["request"]["bytes_len"], jpeg.len());
        assert_eq!(body["request"]["custom_metadata"], json!({"param1": "value1"}));
        assert_eq!(body["request"]["company_id"], "techbreakerllc");
        assert_eq!(body["request"]["machine_id"], "fridge_002");
        assert_eq!(body["request"]["camera_id"], json!(["cam_001"]));
        assert_eq!(body["request"]["browser"], "glimpse-test/1.0");
        assert!(body["request"]["ip"].is_string());
        assert_eq!(
            body["llm_response"],
            json!({
                "content": "no person detected",
                "model": "gpt-4o",
                "prompt_tokens": 50,
                "completion_tokens": 5,
                "total_tokens": 55,
                "finish_reason": "stop"
            })
        );
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_ok() {
        let h = harness(Ok(record()), PersistStatus::Error);
        let image = base64::engine::general_purpose::STANDARD.encode(jpeg_bytes());

        let response = h.server.post("/analyze").json(&payload(&image)).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["llm_response"]["content"], "no person detected");
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bad_base64_is_client_error() {
        let h = harness(Ok(record()), PersistStatus::Success);

        let response = h
            .server
            .post("/analyze")
            .json(&payload("###"))
            .expect_failure()
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("base64"));
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_server_error_naming_model() {
        let h = harness(
            Err(ProviderError::CallFailed {
                message: "Model 'gpt-3.5-turbo' does not support image URLs. \
                          Use gpt-4-vision, gpt-4-turbo, or gpt-4o instead."
                    .into(),
                status_code: Some(400),
            }),
            PersistStatus::Success,
        );
        let image = base64::engine::general_purpose::STANDARD.encode(jpeg_bytes());

        let response = h
            .server
            .post("/analyze")
            .json(&payload(&image))
            .expect_failure()
            .await;

        assert!(response.status_code().is_server_error());
        let body: Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("gpt-3.5-turbo"));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_field_uses_framework_rejection() {
        let h = harness(Ok(record()), PersistStatus::Success);

        let response = h
            .server
            .post("/analyze")
            .json(&json!({"image": "AAAA", "metadata": {}, "camera_id": "cam_001"}))
            .expect_failure()
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let h = harness_with(
            Ok(record()),
            PersistStatus::Success,
            ServerConfig {
                max_body_bytes: 1024,
                ..ServerConfig::default()
            },
        );

        let response = h
            .server
            .post("/analyze")
            .json(&payload(&"A".repeat(4096)))
            .expect_failure()
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 0);
    }
}
