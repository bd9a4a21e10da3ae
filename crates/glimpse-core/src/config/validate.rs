//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::llm::SUPPORTED_PROVIDERS;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError("server.port must be > 0".into()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_bytes must be > 0".into(),
            ));
        }
        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "llm.provider '{}' is not one of: {}",
                self.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }
        if self.llm.max_tokens() == 0 {
            return Err(ConfigError::ValidationError(format!(
                "llm.{}.max_tokens must be > 0",
                self.llm.provider
            )));
        }
        if self.prompt_template.system_prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prompt_template.system_prompt must not be empty".into(),
            ));
        }
        if self.prompt_template.analysis_prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "prompt_template.analysis_prompt must not be empty".into(),
            ));
        }
        if self.warehouse.table.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "warehouse.table must not be empty".into(),
            ));
        }
        if !(5..=50).contains(&self.warehouse.wait_timeout_secs) {
            return Err(ConfigError::ValidationError(
                "warehouse.wait_timeout_secs must be between 5 and 50".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnthropicConfig;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut config = Config::default();
        config.llm.provider = "gemini".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("gemini"));
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens_for_selected_provider() {
        let mut config = Config::default();
        config.llm.provider = "anthropic".into();
        config.llm.anthropic = Some(AnthropicConfig {
            max_tokens: 0,
            ..AnthropicConfig::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.anthropic.max_tokens"));
    }

    #[test]
    fn test_validate_rejects_wait_timeout_out_of_range() {
        let mut config = Config::default();
        config.warehouse.wait_timeout_secs = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("wait_timeout_secs"));

        config.warehouse.wait_timeout_secs = 51;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_prompt() {
        let mut config = Config::default();
        config.prompt_template.analysis_prompt = "   ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("analysis_prompt"));
    }

    #[test]
    fn test_validate_rejects_empty_system_prompt() {
        let mut config = Config::default();
        config.prompt_template.system_prompt = "\n".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("system_prompt"));
    }
}
