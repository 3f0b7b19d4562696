// Chat-completions adapter
//
// Speaks the OpenAI chat-completions protocol: the conversation is a flat
// list of role-tagged turns, tool results ride as `role: "tool"` messages
// keyed by `tool_call_id`, and tool-call arguments travel as JSON encoded in
// a string. Works against any endpoint implementing the same protocol.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use chronicle_core::event::{TokenUsage, ToolCall};
use chronicle_core::{ChatMessage, ChatRole, ToolDeclaration};

use crate::client::{LlmClient, LlmCompletion};
use crate::error::LlmError;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// LLM client for OpenAI-compatible chat-completions APIs.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: model.into(),
            max_tokens: 4096,
        }
    }

    /// Read the API key from `OPENAI_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| LlmError::Other("OPENAI_API_KEY environment variable not set".into()))?;
        Ok(Self::new(api_key, model))
    }

    /// Point at an OpenAI-compatible endpoint other than api.openai.com.
    pub fn with_base_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn call(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDeclaration],
        system_prompt: Option<&str>,
    ) -> Result<LlmCompletion, LlmError> {
        let request = build_request(
            &self.model,
            self.max_tokens,
            messages,
            tools,
            system_prompt,
        );

        debug!(model = %self.model, messages = messages.len(), "calling chat-completions API");

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::api(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::api(format!("HTTP {status}: {body}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::response(format!("invalid response body: {e}")))?;

        parse_response(body, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Request / response mapping
// ============================================================================

fn build_request(
    model: &str,
    max_tokens: u32,
    messages: &[ChatMessage],
    tools: &[ToolDeclaration],
    system_prompt: Option<&str>,
) -> ChatRequest {
    let mut wire_messages = Vec::with_capacity(messages.len() + 1);

    if let Some(prompt) = system_prompt {
        wire_messages.push(WireMessage {
            role: "system".to_string(),
            content: Some(prompt.to_string()),
            tool_calls: None,
            tool_call_id: None,
        });
    }

    for message in messages {
        wire_messages.push(convert_message(message));
    }

    ChatRequest {
        model: model.to_string(),
        messages: wire_messages,
        max_tokens,
        tools: if tools.is_empty() {
            None
        } else {
            Some(tools.iter().map(convert_tool).collect())
        },
    }
}

fn convert_message(message: &ChatMessage) -> WireMessage {
    match message.role {
        ChatRole::User => WireMessage {
            role: "user".to_string(),
            content: Some(message.text.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        ChatRole::Assistant => WireMessage {
            role: "assistant".to_string(),
            // The protocol allows a null content when only tool calls are present.
            content: if message.text.is_empty() && message.has_tool_calls() {
                None
            } else {
                Some(message.text.clone())
            },
            tool_calls: if message.tool_calls.is_empty() {
                None
            } else {
                Some(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| WireToolCall {
                            id: call.id.clone(),
                            kind: "function".to_string(),
                            function: WireFunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.to_string(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
        },
        ChatRole::Tool => WireMessage {
            role: "tool".to_string(),
            content: Some(message.text.clone()),
            tool_calls: None,
            tool_call_id: message.tool_call_id.clone(),
        },
    }
}

fn convert_tool(tool: &ToolDeclaration) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

fn parse_response(body: ChatResponse, fallback_model: &str) -> Result<LlmCompletion, LlmError> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::response("response contained no choices"))?;

    let response_text = choice.message.content.unwrap_or_default();

    let mut tool_calls = Vec::new();
    for wire_call in choice.message.tool_calls.unwrap_or_default() {
        // Arguments arrive as a JSON-encoded string.
        let arguments: Value = serde_json::from_str(&wire_call.function.arguments)
            .map_err(|e| {
                LlmError::response(format!(
                    "tool call '{}' has unparseable arguments: {e}",
                    wire_call.function.name
                ))
            })?;
        tool_calls.push(ToolCall::new(
            wire_call.id,
            wire_call.function.name,
            arguments,
        ));
    }

    if response_text.trim().is_empty() && tool_calls.is_empty() {
        return Err(LlmError::response(
            "model returned neither text nor tool calls",
        ));
    }

    let token_usage = body
        .usage
        .map(|usage| TokenUsage {
            input: usage.prompt_tokens,
            output: usage.completion_tokens,
            total: usage.total_tokens,
        })
        .unwrap_or_default();

    Ok(LlmCompletion {
        response_text,
        tool_calls,
        model_name: body.model.unwrap_or_else(|| fallback_model.to_string()),
        token_usage,
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}
