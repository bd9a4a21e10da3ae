//! OpenAI LLM provider using the Chat Completions API.
//!
//! Sends the system prompt as its own message and the image via data URL in
//! the user message content array.

use super::normalize::{Completion, TokenUsage};
use super::provider::{LlmProvider, LlmRequest};
use crate::error::ProviderError;
use crate::types::{AnalysisRecord, FinishReason};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Error fragments OpenAI uses when a model cannot take image input.
const IMAGE_UNSUPPORTED_HINTS: &[&str] = &[
    "is only supported by certain models",
    "does not support image",
];

/// OpenAI provider using Chat Completions API.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, model: &str, endpoint: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            timeout,
        }
    }

    fn unsupported_image_input(&self, status_code: u16) -> ProviderError {
        ProviderError::CallFailed {
            message: format!(
                "Model '{}' does not support image URLs. \
                 Use gpt-4-vision, gpt-4-turbo, or gpt-4o instead.",
                self.model
            ),
            status_code: Some(status_code),
        }
    }
}

// --- Request types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageBody,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageBody {
    Text(String),
    Parts(Vec<ChatContent>),
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum ChatContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

// --- Response types ---

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<ReplyContent>,
    refusal: Option<String>,
}

/// Message content is usually a string; some compatible servers send parts.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReplyContent {
    Text(String),
    Parts(Vec<ReplyPart>),
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

impl ReplyContent {
    fn into_text(self) -> String {
        match self {
            ReplyContent::Text(text) => text,
            ReplyContent::Parts(parts) => parts.into_iter().filter_map(|p| p.text).collect(),
        }
    }
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

impl From<ChatUsage> for TokenUsage {
    fn from(usage: ChatUsage) -> Self {
        Self {
            prompt: usage.prompt_tokens,
            completion: usage.completion_tokens,
            total: usage.total_tokens,
        }
    }
}

fn build_request(model: &str, request: &LlmRequest) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        max_completion_tokens: request.max_tokens,
        messages: vec![
            ChatMessage {
                role: "system",
                content: MessageBody::Text(request.system_prompt.clone()),
            },
            ChatMessage {
                role: "user",
                content: MessageBody::Parts(vec![
                    ChatContent::Text {
                        text: request.analysis_prompt.clone(),
                    },
                    ChatContent::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                ]),
            },
        ],
    }
}

/// Resolve a Chat Completions body into a [`Completion`].
fn completion_from_body(body: Value) -> Result<Completion, ProviderError> {
    if let Value::String(text) = body {
        return Ok(Completion::Raw(text));
    }

    let chat: ChatResponse = serde_json::from_value(body).map_err(|e| {
        ProviderError::call_failed(format!("Failed to parse OpenAI response: {e}"))
    })?;

    let choice = chat.choices.into_iter().next().ok_or_else(|| {
        ProviderError::call_failed("OpenAI returned empty choices array, no content generated")
    })?;

    if let Some(reason) = choice.message.refusal.filter(|r| !r.is_empty()) {
        return Err(ProviderError::Refusal { reason });
    }

    Ok(Completion::Structured {
        content: choice
            .message
            .content
            .map(ReplyContent::into_text)
            .unwrap_or_default(),
        model: chat.model,
        usage: chat.usage.map(TokenUsage::from).unwrap_or_default(),
        finish_reason: FinishReason::from_openai(choice.finish_reason.as_deref()),
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::call_failed(format!("OpenAI request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            if status.is_client_error() && IMAGE_UNSUPPORTED_HINTS.iter().any(|h| text.contains(h))
            {
                return Err(self.unsupported_image_input(status.as_u16()));
            }
            return Err(ProviderError::CallFailed {
                message: format!("OpenAI HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let body: Value = resp.json().await.map_err(|e| {
            ProviderError::call_failed(format!("Failed to parse OpenAI response: {e}"))
        })?;
        let record = completion_from_body(body)?.into_record(&self.model);

        tracing::debug!(
            model = %record.model,
            total_tokens = record.total_tokens,
            latency_ms = start.elapsed().as_millis() as u64,
            "OpenAI analysis complete"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PromptTemplate;
    use crate::llm::provider::ImageInput;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> LlmRequest {
        LlmRequest::analyze_image(
            ImageInput::from_base64("/9j/AAAA", "jpeg"),
            &PromptTemplate {
                system_prompt: "You watch a fridge.".into(),
                analysis_prompt: "Is anyone there?".into(),
            },
            300,
        )
    }

    async fn provider(server: &MockServer, model: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test",
            model,
            &format!("{}/v1/chat/completions", server.uri()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_analyze_sends_two_messages_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "max_completion_tokens": 300,
                "messages": [
                    {"role": "system", "content": "You watch a fridge."},
                    {"role": "user", "content": [
                        {"type": "text", "text": "Is anyone there?"},
                        {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,/9j/AAAA"}}
                    ]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "no person detected", "refusal": null},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 50, "completion_tokens": 5, "total_tokens": 55}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = provider(&server, "gpt-4o").await.analyze(&request()).await.unwrap();
        assert_eq!(
            record,
            AnalysisRecord {
                content: "no person detected".into(),
                model: "gpt-4o".into(),
                prompt_tokens: 50,
                completion_tokens: 5,
                total_tokens: 55,
                finish_reason: FinishReason::Stop,
            }
        );
    }

    #[tokio::test]
    async fn test_refusal_field_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o",
                "choices": [{
                    "message": {"role": "assistant", "content": null, "refusal": "I can't help with that."},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let err = provider(&server, "gpt-4o").await.analyze(&request()).await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::Refusal {
                reason: "I can't help with that.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_non_vision_model_error_names_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "Invalid content type. image_url is only supported by certain models.",
                    "type": "invalid_request_error"
                }
            })))
            .mount(&server)
            .await;

        let err = provider(&server, "gpt-3.5-turbo")
            .await
            .analyze(&request())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'gpt-3.5-turbo'"));
        assert!(message.contains("gpt-4o"));
        assert!(matches!(err, ProviderError::CallFailed { status_code: Some(400), .. }));
    }

    #[tokio::test]
    async fn test_server_error_propagates_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server, "gpt-4o").await.analyze(&request()).await.unwrap_err();
        match err {
            ProviderError::CallFailed {
                message,
                status_code,
            } => {
                assert_eq!(status_code, Some(503));
                assert!(message.contains("overloaded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_string_body_is_raw_completion() {
        let completion = completion_from_body(json!("three yogurts")).unwrap();
        assert_eq!(completion, Completion::Raw("three yogurts".into()));
    }

    #[test]
    fn test_content_parts_and_missing_usage() {
        let completion = completion_from_body(json!({
            "choices": [{
                "message": {"content": [{"type": "text", "text": "half "}, {"type": "text", "text": "empty"}]}
            }]
        }))
        .unwrap();
        let record = completion.into_record("local-vision");
        assert_eq!(record.content, "half empty");
        assert_eq!(record.model, "local-vision");
        assert_eq!(record.total_tokens, 0);
        assert_eq!(record.finish_reason, FinishReason::Unknown);
    }

    #[test]
    fn test_empty_choices_is_call_failure() {
        let err = completion_from_body(json!({"model": "gpt-4o", "choices": []})).unwrap_err();
        assert!(err.to_string().contains("empty choices"));
    }
}
