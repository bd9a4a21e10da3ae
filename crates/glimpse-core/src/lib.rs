//! Glimpse Core - image analysis relay library.
//!
//! Glimpse accepts a base64 camera image plus metadata, asks a vision LLM to
//! analyze it, logs the request and the answer to a SQL warehouse table, and
//! hands the analysis back to the caller.
//!
//! # Architecture
//!
//! ```text
//! AnalysisRequest → Decode + Detect Format → LlmProvider → AnalysisRecord
//!                                                     ↘ AnalysisSink (outcome only logged)
//! ```
//!
//! The library has no HTTP server types; the `glimpse` binary wires
//! [`Analyzer`] into an axum router.
//!
//! # Usage
//!
//! ```rust,ignore
//! use glimpse_core::{Analyzer, Config, RequestContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(&Config::default_path())?;
//!     let analyzer = Analyzer::from_config(&config)?;
//!
//!     let request = serde_json::from_str(r#"{"image": "...", "metadata": {},
//!         "machine_id": "fridge_001", "camera_id": "cam_001"}"#)?;
//!     let response = analyzer.analyze(request, RequestContext::default()).await?;
//!     println!("{}", response.llm_response.content);
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod inspect;
pub mod llm;
pub mod persistence;
pub mod types;

pub use analyzer::Analyzer;
pub use config::Config;
pub use error::{AnalyzeError, ConfigError, InputError, PersistError, ProviderError};
pub use llm::{LlmProvider, LlmProviderFactory, LlmRequest};
pub use persistence::{AnalysisSink, PersistContext, PersistOutcome, PersistStatus};
pub use types::{
    AnalysisRecord, AnalysisRequest, AnalysisResponse, CameraId, FinishReason, RequestContext,
    RequestSummary,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
