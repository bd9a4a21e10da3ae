//! LLM provider trait and request types.
//!
//! Defines the interface that all LLM providers implement, plus the
//! factory that creates the configured provider at startup.

use crate::config::{LlmConfig, PromptTemplate};
use crate::error::ProviderError;
use crate::inspect;
use crate::types::AnalysisRecord;
use async_trait::async_trait;
use std::time::Duration;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Wrap already-validated base64 data with the MIME type of its detected format.
    pub fn from_base64(data: &str, format: &str) -> Self {
        Self {
            data: inspect::compact_base64(data),
            media_type: inspect::media_type(format),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request to analyze one image.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// The image to analyze
    pub image: ImageInput,
    /// System-role instructions
    pub system_prompt: String,
    /// Text sent alongside the image
    pub analysis_prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl LlmRequest {
    /// Build an analysis request from the configured prompt template.
    pub fn analyze_image(image: ImageInput, prompts: &PromptTemplate, max_tokens: u32) -> Self {
        Self {
            image,
            system_prompt: prompts.system_prompt.clone(),
            analysis_prompt: prompts.analysis_prompt.clone(),
            max_tokens,
        }
    }
}

/// Trait that all LLM providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the analyzer holds an `Arc<dyn LlmProvider>`).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai", "anthropic").
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Analyze the image and return the normalized record.
    async fn analyze(&self, request: &LlmRequest) -> Result<AnalysisRecord, ProviderError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the provider selected by configuration.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider for `provider` ("openai", "anthropic").
    ///
    /// Fails when the key is unknown or the provider's API key does not resolve.
    pub fn create(
        provider: &str,
        config: &LlmConfig,
    ) -> Result<Box<dyn LlmProvider>, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        match provider {
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| {
                    ProviderError::call_failed("OpenAI API key not set. Set OPENAI_API_KEY env var.")
                })?;
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &api_key,
                    &cfg.model,
                    &cfg.endpoint,
                    timeout,
                )))
            }
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| {
                    ProviderError::call_failed(
                        "Anthropic API key not set. Set ANTHROPIC_API_KEY env var.",
                    )
                })?;
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key,
                    &cfg.model,
                    &cfg.endpoint,
                    timeout,
                )))
            }
            other => Err(ProviderError::call_failed(format!(
                "Unknown LLM provider: {other}"
            ))),
        }
    }
}
