//! Vision LLM integration.
//!
//! Provides a provider abstraction over multiple chat-completion vendors
//! (OpenAI, Anthropic). Each variant builds its own request shape and folds
//! its own response shape into the canonical [`crate::types::AnalysisRecord`].

pub(crate) mod anthropic;
pub(crate) mod normalize;
pub(crate) mod openai;
pub(crate) mod provider;

pub use provider::{resolve_env_var, ImageInput, LlmProvider, LlmProviderFactory, LlmRequest};

/// Provider keys accepted in `llm.provider`.
pub const SUPPORTED_PROVIDERS: &[&str] = &["openai", "anthropic"];
