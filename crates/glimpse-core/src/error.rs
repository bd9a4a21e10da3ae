//! Error types for the Glimpse analysis relay.
//!
//! Errors are organized by the stage that produces them so the HTTP layer
//! can map each category onto a status code without inspecting messages.

use thiserror::Error;

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// The inbound image could not be accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// The `image` field is not valid base64
    #[error("Invalid base64 image data: {0}")]
    InvalidBase64(String),

    /// The decoded bytes are not an image format we can forward
    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),
}

/// Failures reported by an LLM provider variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failure, non-success HTTP status or malformed response
    #[error("{message}")]
    CallFailed {
        message: String,
        status_code: Option<u16>,
    },

    /// The model explicitly declined to answer
    #[error("Model refused: {reason}")]
    Refusal { reason: String },
}

impl ProviderError {
    pub(crate) fn call_failed(message: impl Into<String>) -> Self {
        Self::CallFailed {
            message: message.into(),
            status_code: None,
        }
    }
}

/// Failures inside the persistence gateway.
///
/// These never leave [`crate::persistence::LogStore`]; they are folded into a
/// [`crate::persistence::PersistOutcome`] before the orchestrator sees them.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Could not open a warehouse connection
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Could not encode a JSON column
    #[error("Failed to encode JSON column: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The statement could not be staged or executed
    #[error("Write failed: {0}")]
    Write(String),

    /// The warehouse rejected or failed the committed statement
    #[error("Commit failed: {0}")]
    Commit(String),

    /// Rollback or close failed during cleanup
    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

/// Terminal failures of a single `/analyze` request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeError {
    /// Rejected before any provider call
    #[error(transparent)]
    Input(#[from] InputError),

    /// The provider call failed; nothing was persisted
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
