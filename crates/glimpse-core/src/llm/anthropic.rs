//! Anthropic LLM provider using the Messages API.
//!
//! The system prompt travels in the top-level `system` field and the image
//! as a base64 content block next to the analysis prompt.

use super::normalize::{Completion, TokenUsage};
use super::provider::{LlmProvider, LlmRequest};
use crate::error::ProviderError;
use crate::types::{AnalysisRecord, FinishReason};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const API_VERSION: &str = "2023-06-01";

/// Anthropic provider using the Messages API.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str, endpoint: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            timeout,
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    system: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "text")]
    Text { text: String },
}

#[derive(Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseContent>,
    model: Option<String>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseContent {
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt: usage.input_tokens,
            completion: usage.output_tokens,
            total: None,
        }
    }
}

fn build_request(model: &str, request: &LlmRequest) -> MessagesRequest {
    MessagesRequest {
        model: model.to_string(),
        max_tokens: request.max_tokens,
        system: request.system_prompt.clone(),
        messages: vec![Message {
            role: "user".to_string(),
            content: vec![
                ContentBlock::Image {
                    source: ImageSource {
                        source_type: "base64".to_string(),
                        media_type: request.image.media_type.clone(),
                        data: request.image.data.clone(),
                    },
                },
                ContentBlock::Text {
                    text: request.analysis_prompt.clone(),
                },
            ],
        }],
    }
}

fn completion_from_response(resp: MessagesResponse) -> Result<Completion, ProviderError> {
    let text = resp
        .content
        .into_iter()
        .filter_map(|c| c.text)
        .collect::<Vec<_>>()
        .join("");

    if resp.stop_reason.as_deref() == Some("refusal") {
        let reason = if text.is_empty() {
            "stop_reason=refusal".to_string()
        } else {
            text
        };
        return Err(ProviderError::Refusal { reason });
    }

    Ok(Completion::Structured {
        content: text,
        model: resp.model,
        usage: resp.usage.map(TokenUsage::from).unwrap_or_default(),
        finish_reason: FinishReason::from_anthropic(resp.stop_reason.as_deref()),
    })
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, request: &LlmRequest) -> Result<AnalysisRecord, ProviderError> {
        let start = Instant::now();
        let body = build_request(&self.model, request);

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::call_failed(format!("Anthropic request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::CallFailed {
                message: format!("Anthropic HTTP {status} for model '{}': {text}", self.model),
                status_code: Some(status.as_u16()),
            });
        }

        let messages_resp: MessagesResponse = resp.json().await.map_err(|e| {
            ProviderError::call_failed(format!("Failed to parse Anthropic response: {e}"))
        })?;
        let record = completion_from_response(messages_resp)?.into_record(&self.model);

        tracing::debug!(
            model = %record.model,
            total_tokens = record.total_tokens,
            latency_ms = start.elapsed().as_millis() as u64,
            "Anthropic analysis complete"
        );
        Ok(record)
    }
}
