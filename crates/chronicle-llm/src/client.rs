// LlmClient contract
//
// One method unifies chat-style and tool-use providers. `messages` is the
// output of the LLM-context projection; `tools` the registry's declarations
// (empty slice means the provider gets no tool list at all).

use async_trait::async_trait;

use chronicle_core::event::{TokenUsage, ToolCall};
use chronicle_core::{ChatMessage, ToolDeclaration};

use crate::error::LlmError;

/// A completed model response, normalized across providers.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCompletion {
    pub response_text: String,
    pub tool_calls: Vec<ToolCall>,
    pub model_name: String,
    pub token_usage: TokenUsage,
}

/// Provider-neutral LLM call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn call(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDeclaration],
        system_prompt: Option<&str>,
    ) -> Result<LlmCompletion, LlmError>;

    /// The configured model identifier, recorded on every response event.
    fn model_name(&self) -> &str;
}
