//! Folding vendor completions into the canonical record.
//!
//! Each provider resolves its wire response into a [`Completion`] exactly
//! once; nothing vendor-shaped travels past this point. Field presence is
//! what matters: a count the vendor omitted becomes zero and an absent
//! finish reason becomes [`FinishReason::Unknown`].

use crate::types::{AnalysisRecord, FinishReason};

/// Token counts as reported by a vendor; any of them may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TokenUsage {
    pub prompt: Option<u64>,
    pub completion: Option<u64>,
    pub total: Option<u64>,
}

/// A vendor completion after shape resolution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Completion {
    /// A full completion object: message plus bookkeeping fields.
    Structured {
        content: String,
        model: Option<String>,
        usage: TokenUsage,
        finish_reason: FinishReason,
    },
    /// Bare text with no bookkeeping.
    Raw(String),
}

impl Completion {
    /// Build the canonical record. `requested_model` fills in when the
    /// vendor did not echo a model id.
    pub(crate) fn into_record(self, requested_model: &str) -> AnalysisRecord {
        match self {
            Completion::Structured {
                content,
                model,
                usage,
                finish_reason,
            } => {
                let prompt_tokens = usage.prompt.unwrap_or(0);
                let completion_tokens = usage.completion.unwrap_or(0);
                let total_tokens = usage
                    .total
                    .unwrap_or_else(|| prompt_tokens.saturating_add(completion_tokens));
                AnalysisRecord {
                    content,
                    model: model
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| requested_model.to_string()),
                    prompt_tokens,
                    completion_tokens,
                    total_tokens,
                    finish_reason,
                }
            }
            Completion::Raw(content) => AnalysisRecord {
                content,
                model: requested_model.to_string(),
                prompt_tokens: 0,
                completion_tokens: 0,
                total_tokens: 0,
                finish_reason: FinishReason::Unknown,
            },
        }
    }
}
