//! Core data types for the Glimpse analysis relay.
//!
//! The inbound request, the canonical analysis record every provider
//! normalizes into, the caller context captured from the transport, and the
//! response returned to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Message returned with every successful analysis.
pub const CAPTURED_MESSAGE: &str = "Image decoded and request captured";

/// Camera identifier as sent by clients: a single id or a list of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CameraId {
    One(String),
    Many(Vec<String>),
}

impl CameraId {
    /// Normalize to an ordered list of ids.
    pub fn into_ids(self) -> Vec<String> {
        match self {
            CameraId::One(id) => vec![id],
            CameraId::Many(ids) => ids,
        }
    }
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Base64-encoded image
    pub image: String,

    /// Free-form caller metadata, stored and echoed untouched
    pub metadata: Map<String, Value>,

    /// Tenant id; the configured default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,

    /// Machine (fridge) that captured the image
    pub machine_id: String,

    /// Camera or cameras that captured the image
    pub camera_id: CameraId,
}

/// Why the model stopped generating.
///
/// Serialized as a snake_case string. Vendor values with no common meaning
/// are kept verbatim in [`FinishReason::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    /// The vendor did not report a reason
    Unknown,
    Other(String),
}

impl FinishReason {
    /// Map an OpenAI-style `finish_reason` string.
    pub fn from_openai(reason: Option<&str>) -> Self {
        match reason {
            Some("function_call") => Self::ToolCalls,
            Some(other) => Self::from(other.to_string()),
            None => Self::Unknown,
        }
    }

    /// Map an Anthropic `stop_reason` string.
    pub fn from_anthropic(reason: Option<&str>) -> Self {
        match reason {
            Some("end_turn") | Some("stop_sequence") => Self::Stop,
            Some("max_tokens") => Self::Length,
            Some("tool_use") => Self::ToolCalls,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::ToolCalls => "tool_calls",
            Self::Unknown => "unknown",
            Self::Other(reason) => reason,
        }
    }
}

impl From<String> for FinishReason {
    fn from(reason: String) -> Self {
        match reason.as_str() {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "content_filter" => Self::ContentFilter,
            "tool_calls" => Self::ToolCalls,
            "unknown" | "" => Self::Unknown,
            _ => Self::Other(reason),
        }
    }
}

impl From<FinishReason> for String {
    fn from(reason: FinishReason) -> Self {
        match reason {
            FinishReason::Other(reason) => reason,
            known => known.as_str().to_string(),
        }
    }
}

/// Canonical, vendor-independent result of one analysis.
///
/// Token counts the provider did not report are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub finish_reason: FinishReason,
}

/// Caller details pulled from the transport. Building one never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// `User-Agent` header, if sent
    pub user_agent: Option<String>,

    /// Peer address, or "unknown" when the transport does not expose it
    pub client_ip: String,

    /// All request headers; repeated headers are joined with ", "
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    /// Headers rendered as a JSON object string for the log table.
    pub fn headers_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.headers)
    }
}

/// The `request` block echoed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSummary {
    pub bytes_len: usize,
    pub custom_metadata: Map<String, Value>,
    pub company_id: String,
    pub machine_id: String,
    pub camera_id: Vec<String>,
    pub browser: Option<String>,
    pub ip: String,
}

/// Successful `POST /analyze` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub message: String,
    pub request: RequestSummary,
    pub llm_response: AnalysisRecord,
}
