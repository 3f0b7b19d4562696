// Anthropic Messages adapter
//
// The Messages API keeps tool use separate from text: an assistant turn is a
// list of content blocks (`text`, `tool_use`), and tool results go back as
// `tool_result` blocks inside a user turn. The system prompt is a top-level
// field rather than a message. This adapter folds all of that back into the
// shared `LlmCompletion`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use chronicle_core::event::{TokenUsage, ToolCall};
use chronicle_core::{ChatMessage, ChatRole, ToolDeclaration};

use crate::client::{LlmClient, LlmCompletion};
use crate::error::LlmError;

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// LLM client for the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicMessagesClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicMessagesClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: model.into(),
            max_tokens: 4096,
        }
    }

    /// Read the API key from `ANTHROPIC_API_KEY`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            LlmError::Other("ANTHROPIC_API_KEY environment variable not set".into())
        })?;
        Ok(Self::new(api_key, model))
    }

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
impl LlmClient for AnthropicMessagesClient {
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
        )?;

        debug!(model = %self.model, messages = messages.len(), "calling Anthropic messages API");

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::api(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::api(format!("HTTP {status}: {body}")));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::response(format!("invalid response body: {e}")))?;

        parse_response(body, &self.model)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for AnthropicMessagesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicMessagesClient")
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
) -> Result<MessagesRequest, LlmError> {
    let mut wire_messages: Vec<WireMessage> = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            ChatRole::User => wire_messages.push(WireMessage {
                role: "user".to_string(),
                content: vec![json!({"type": "text", "text": message.text})],
            }),
            ChatRole::Assistant => {
                let mut blocks = Vec::new();
                if !message.text.is_empty() {
                    blocks.push(json!({"type": "text", "text": message.text}));
                }
                for call in &message.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                if blocks.is_empty() {
                    return Err(LlmError::response(
                        "assistant turn has neither text nor tool calls",
                    ));
                }
                wire_messages.push(WireMessage {
                    role: "assistant".to_string(),
                    content: blocks,
                });
            }
            ChatRole::Tool => {
                let tool_use_id = message.tool_call_id.clone().ok_or_else(|| {
                    LlmError::response("tool result message is missing its tool_call_id")
                })?;
                let block = json!({
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "content": message.text,
                });
                // Consecutive tool results merge into one user turn; the API
                // rejects two user messages in a row.
                match wire_messages.last_mut() {
                    Some(last) if last.role == "user" && last.is_tool_results() => {
                        last.content.push(block);
                    }
                    _ => wire_messages.push(WireMessage {
                        role: "user".to_string(),
                        content: vec![block],
                    }),
                }
            }
        }
    }

    Ok(MessagesRequest {
        model: model.to_string(),
        max_tokens,
        system: system_prompt.map(str::to_string),
        messages: wire_messages,
        tools: if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|tool| {
                        json!({
                            "name": tool.name,
                            "description": tool.description,
                            "input_schema": tool.parameters,
                        })
                    })
                    .collect(),
            )
        },
    })
}

fn parse_response(body: MessagesResponse, fallback_model: &str) -> Result<LlmCompletion, LlmError> {
    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in body.content {
        match block {
            ContentBlock::Text { text } => text_parts.push(text),
            ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall::new(id, name, input));
            }
            ContentBlock::Other => {}
        }
    }

    let response_text = text_parts.join("");
    if response_text.trim().is_empty() && tool_calls.is_empty() {
        return Err(LlmError::response(
            "model returned neither text nor tool calls",
        ));
    }

    let token_usage = body
        .usage
        .map(|usage| TokenUsage::new(usage.input_tokens, usage.output_tokens))
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
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: Vec<Value>,
}

impl WireMessage {
    fn is_tool_results(&self) -> bool {
        self.content
            .iter()
            .all(|block| block.get("type").and_then(Value::as_str) == Some("tool_result"))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_separates_text_and_tool_use_blocks() {
        let messages = vec![
            ChatMessage::user("what is 55 + 10?"),
            ChatMessage::assistant(
                "Let me calculate that.",
                vec![ToolCall::new("toolu_1", "calculate", json!({"expression": "55 + 10"}))],
            ),
            ChatMessage::tool_result("toolu_1", "calculate", "65.0"),
        ];
        let tools = vec![ToolDeclaration {
            name: "calculate".to_string(),
            description: "math".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];

        let request = build_request("claude-sonnet-4-5", 1024, &messages, &tools, Some("help")).unwrap();
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["system"], "help");
        assert_eq!(value["messages"][1]["role"], "assistant");
        assert_eq!(value["messages"][1]["content"][0]["type"], "text");
        assert_eq!(value["messages"][1]["content"][1]["type"], "tool_use");
        assert_eq!(
            value["messages"][1]["content"][1]["input"]["expression"],
            "55 + 10"
        );
        // Tool results come back as a user turn of tool_result blocks.
        assert_eq!(value["messages"][2]["role"], "user");
        assert_eq!(value["messages"][2]["content"][0]["type"], "tool_result");
        assert_eq!(value["messages"][2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(value["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn consecutive_tool_results_share_one_user_turn() {
        let messages = vec![
            ChatMessage::assistant(
                "",
                vec![
                    ToolCall::new("t1", "echo", json!({})),
                    ToolCall::new("t2", "echo", json!({})),
                ],
            ),
            ChatMessage::tool_result("t1", "echo", "a"),
            ChatMessage::tool_result("t2", "echo", "b"),
        ];

        let request = build_request("claude-sonnet-4-5", 1024, &messages, &[], None).unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].content.len(), 2);
    }

    #[test]
    fn parses_mixed_content_blocks() {
        let body: MessagesResponse = serde_json::from_value(json!({
            "model": "claude-sonnet-4-5",
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "toolu_9", "name": "get_current_time", "input": {}}
            ],
            "usage": {"input_tokens": 20, "output_tokens": 9}
        }))
        .unwrap();

        let completion = parse_response(body, "fallback").unwrap();
        assert_eq!(completion.response_text, "Checking.");
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "toolu_9");
        assert_eq!(completion.token_usage, TokenUsage::new(20, 9));
    }

    #[test]
    fn empty_content_is_a_response_error() {
        let body: MessagesResponse =
            serde_json::from_value(json!({"content": []})).unwrap();
        assert!(matches!(
            parse_response(body, "m").unwrap_err(),
            LlmError::Response(_)
        ));
    }

    #[test]
    fn unknown_block_kinds_are_ignored() {
        let body: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "done"}
            ]
        }))
        .unwrap();
        let completion = parse_response(body, "m").unwrap();
        assert_eq!(completion.response_text, "done");
    }
}
