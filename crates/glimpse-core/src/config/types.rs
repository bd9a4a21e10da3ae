//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Maximum accepted request body in bytes (images arrive inline as base64)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_body_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Defaults applied to inbound requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Tenant used when a request omits `company_id`
    pub default_company_id: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_company_id: "techbreakerllc".to_string(),
        }
    }
}

/// Prompts sent with every image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplate {
    /// System-role message
    pub system_prompt: String,

    /// Text that accompanies the image in the user-role message
    pub analysis_prompt: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system_prompt: "You are a vision assistant that monitors the inside of a smart \
                            refrigerator through its cameras. Answer factually and only \
                            describe what is visible."
                .to_string(),
            analysis_prompt: "List the food and drink items visible in this image, note any \
                              empty shelves, and say whether a person or hand is present."
                .to_string(),
        }
    }
}

/// LLM provider selection and per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Which provider table to use ("openai" or "anthropic")
    pub provider: String,

    /// Transport timeout for a single provider call, in seconds
    pub timeout_secs: u64,

    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,

    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            timeout_secs: 60,
            openai: Some(OpenAiConfig::default()),
            anthropic: None,
        }
    }
}

impl LlmConfig {
    /// Max output tokens configured for the selected provider.
    pub fn max_tokens(&self) -> u32 {
        match self.provider.as_str() {
            "anthropic" => self.anthropic.clone().unwrap_or_default().max_tokens,
            _ => self.openai.clone().unwrap_or_default().max_tokens,
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Upper bound on completion tokens
    pub max_tokens: u32,

    /// Chat Completions URL
    pub endpoint: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 300,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Upper bound on output tokens
    pub max_tokens: u32,

    /// Messages API URL
    pub endpoint: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 300,
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
        }
    }
}

/// Databricks SQL warehouse settings for the analysis log table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Workspace hostname, with or without scheme (supports ${ENV_VAR} syntax)
    pub host: String,

    /// SQL warehouse id (supports ${ENV_VAR} syntax)
    pub warehouse_id: String,

    /// Personal access token (supports ${ENV_VAR} syntax)
    pub token: String,

    /// Fully-qualified log table
    pub table: String,

    /// How long the statement API waits synchronously before answering.
    /// The API accepts 5 to 50 seconds.
    pub wait_timeout_secs: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: "${DATABRICKS_HOST}".to_string(),
            warehouse_id: "${DATABRICKS_WAREHOUSE_ID}".to_string(),
            token: "${DATABRICKS_TOKEN}".to_string(),
            table: "techbreaker_smartfridge.analysis_data.image_analysis_logs".to_string(),
            wait_timeout_secs: 30,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
