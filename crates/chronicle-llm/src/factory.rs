// Client factory
//
// Selects the adapter from the model name: "claude*" models go through the
// Anthropic Messages API, everything else (GPT, Gemini's OpenAI-compatible
// endpoint, local servers) through chat completions. Small interface, tagged
// variants; no inheritance tree needed.

use std::sync::Arc;

use crate::anthropic::AnthropicMessagesClient;
use crate::chat::ChatCompletionsClient;
use crate::client::LlmClient;
use crate::config::LlmConfig;
use crate::error::LlmError;

/// Which protocol family a model name maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    ChatCompletions,
}

impl ProviderKind {
    pub fn for_model(model_name: &str) -> Self {
        if model_name.to_lowercase().starts_with("claude") {
            Self::Anthropic
        } else {
            Self::ChatCompletions
        }
    }
}

/// Build the LLM client for the configured model.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    match ProviderKind::for_model(&config.model_name) {
        ProviderKind::Anthropic => {
            let mut client = AnthropicMessagesClient::from_env(&config.model_name)?
                .with_max_tokens(config.max_tokens);
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url);
            }
            Ok(Arc::new(client))
        }
        ProviderKind::ChatCompletions => {
            let mut client = ChatCompletionsClient::from_env(&config.model_name)?
                .with_max_tokens(config.max_tokens);
            if let Some(base_url) = &config.base_url {
                client = client.with_base_url(base_url);
            }
            Ok(Arc::new(client))
        }
    }
}
