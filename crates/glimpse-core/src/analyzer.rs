//! Request orchestration for `POST /analyze`.
//!
//! One pass per request, terminal on the first failure:
//!
//! ```text
//! decode + detect format → provider call → persist (outcome only logged) → response
//! ```
//!
//! Input errors stop before the provider is called. Provider errors stop
//! before anything is persisted. Persistence never changes what the caller
//! gets back.

use std::sync::Arc;

use crate::config::{Config, PromptTemplate};
use crate::error::{AnalyzeError, ProviderError};
use crate::inspect;
use crate::llm::{ImageInput, LlmProvider, LlmProviderFactory, LlmRequest};
use crate::persistence::{AnalysisSink, DatabricksWarehouse, LogStore, PersistContext};
use crate::types::{
    AnalysisRequest, AnalysisResponse, RequestContext, RequestSummary, CAPTURED_MESSAGE,
};

/// The `/analyze` orchestrator. Cheap to share behind an `Arc`.
pub struct Analyzer {
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn AnalysisSink>,
    prompts: PromptTemplate,
    max_tokens: u32,
    default_company_id: String,
}

impl Analyzer {
    /// Assemble an analyzer from explicit collaborators.
    pub fn new(
        config: &Config,
        provider: Arc<dyn LlmProvider>,
        sink: Arc<dyn AnalysisSink>,
    ) -> Self {
        Self {
            provider,
            sink,
            prompts: config.prompt_template.clone(),
            max_tokens: config.llm.max_tokens(),
            default_company_id: config.request.default_company_id.clone(),
        }
    }

    /// Build the configured provider and the Databricks-backed log store.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let provider = LlmProviderFactory::create(&config.llm.provider, &config.llm)?;
        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            "LLM provider ready"
        );
        let store = LogStore::new(
            DatabricksWarehouse::new(&config.warehouse),
            &config.warehouse.table,
        );
        Ok(Self::new(config, Arc::from(provider), Arc::new(store)))
    }

    /// Run one request through decode, provider call and persistence.
    pub async fn analyze(
        &self,
        request: AnalysisRequest,
        context: RequestContext,
    ) -> Result<AnalysisResponse, AnalyzeError> {
        let image_bytes = inspect::decode_base64(&request.image)?;
        let format = inspect::detect_format(&image_bytes)?;
        let bytes_len = image_bytes.len();
        drop(image_bytes);

        let company_id = request
            .company_id
            .unwrap_or_else(|| self.default_company_id.clone());
        let camera_ids = request.camera_id.into_ids();

        let llm_request = LlmRequest::analyze_image(
            ImageInput::from_base64(&request.image, format),
            &self.prompts,
            self.max_tokens,
        );
        let record = self
            .provider
            .analyze(&llm_request)
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    provider = self.provider.name(),
                    machine_id = %request.machine_id,
                    error = %e,
                    "Provider call failed"
                );
            })?;

        let persist_context = PersistContext {
            bytes_len,
            image_data: request.image,
            custom_metadata: request.metadata,
            company_id,
            machine_id: request.machine_id,
            camera_ids,
            request: context,
        };
        let outcome = self.sink.persist(&record, &persist_context).await;
        if outcome.is_success() {
            tracing::info!(
                machine_id = %persist_context.machine_id,
                bytes_len,
                "Analysis logged"
            );
        } else {
            tracing::warn!(
                machine_id = %persist_context.machine_id,
                message = %outcome.message,
                "Analysis not logged"
            );
        }

        let PersistContext {
            custom_metadata,
            company_id,
            machine_id,
            camera_ids,
            request: context,
            ..
        } = persist_context;

        Ok(AnalysisResponse {
            message: CAPTURED_MESSAGE.to_string(),
            request: RequestSummary {
                bytes_len,
                custom_metadata,
                company_id,
                machine_id,
                camera_id: camera_ids,
                browser: context.user_agent,
                ip: context.client_ip,
            },
            llm_response: record,
        })
    }
}
