// LLM configuration
//
// Model selection and endpoint settings, loaded from MODEL_NAME plus the
// LLM_PROJECT / LLM_LOCATION pair for deployments that route through a cloud
// project. API keys stay in the provider-specific environment variables
// (ANTHROPIC_API_KEY, OPENAI_API_KEY) read by the adapters themselves.

use std::env;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Settings for constructing an LLM client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model_name: String,
    pub project: Option<String>,
    pub location: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            project: None,
            location: None,
            base_url: None,
            max_tokens: 4096,
        }
    }
}

impl LlmConfig {
    /// Load from `MODEL_NAME`, `LLM_PROJECT`, `LLM_LOCATION` and
    /// `LLM_BASE_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model_name: env::var("MODEL_NAME").unwrap_or(defaults.model_name),
            project: env::var("LLM_PROJECT").ok(),
            location: env::var("LLM_LOCATION").ok(),
            base_url: env::var("LLM_BASE_URL").ok(),
            max_tokens: defaults.max_tokens,
        }
    }

    pub fn with_model(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }
}
