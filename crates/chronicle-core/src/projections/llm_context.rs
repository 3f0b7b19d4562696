// LLM-context projection
//
// Folds the stream into the chronological message sequence a chat-style
// model consumes. Only four kinds contribute:
//   UserMessageAdded        -> user message
//   LLMResponseReceived     -> assistant message (text + tool-call stubs)
//   ToolExecutionCompleted  -> tool message with the serialized result
//   ToolExecutionFailed     -> tool message describing the failure
// Everything else is lifecycle bookkeeping and is skipped, as are events
// whose payloads no longer decode.

use crate::chat::ChatMessage;
use crate::event::{AgentEvent, RecordedEvent};

/// Project events to the conversation context for the next LLM call.
///
/// The result order matches stream-position order. A context where the last
/// assistant turn still has unresolved tool calls is valid; the engine will
/// resume tool execution before calling the model again.
pub fn project_llm_context(events: &[RecordedEvent]) -> Vec<ChatMessage> {
    let mut messages = Vec::new();

    for event in events {
        match event.payload() {
            AgentEvent::UserMessageAdded(data) => {
                messages.push(ChatMessage::user(data.message));
            }
            AgentEvent::LlmResponseReceived(data) => {
                messages.push(ChatMessage::assistant(data.response_text, data.tool_calls));
            }
            AgentEvent::ToolExecutionCompleted(data) => {
                // The correlation id lives in metadata; fall back to the tool
                // name so a context is still produced for hand-written streams.
                let call_id = event.tool_call_id().unwrap_or(&data.tool_name).to_string();
                let text = match &data.result {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                messages.push(ChatMessage::tool_result(call_id, data.tool_name, text));
            }
            AgentEvent::ToolExecutionFailed(data) => {
                let call_id = event.tool_call_id().unwrap_or(&data.tool_name).to_string();
                let text = format!("Tool '{}' failed: {}", data.tool_name, data.error_message);
                messages.push(ChatMessage::tool_result(call_id, data.tool_name, text));
            }
            _ => {}
        }
    }

    messages
}

/// The text of the most recent user message, if any.
pub fn last_user_message(events: &[RecordedEvent]) -> Option<String> {
    events.iter().rev().find_map(|event| match event.payload() {
        AgentEvent::UserMessageAdded(data) => Some(data.message),
        _ => None,
    })
}

/// Count completed conversation turns (a user message answered by a model
/// response).
pub fn count_conversation_turns(events: &[RecordedEvent]) -> usize {
    let mut user = 0usize;
    let mut assistant = 0usize;
    for event in events {
        match event.payload() {
            AgentEvent::UserMessageAdded(_) => user += 1,
            AgentEvent::LlmResponseReceived(_) => assistant += 1,
            _ => {}
        }
    }
    user.min(assistant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatRole;
    use crate::event::{
        AgentEvent, LlmResponseData, SessionStartedData, TokenUsage, ToolCall, ToolCompletedData,
        ToolFailedData, UserMessageData,
    };
    use crate::projections::fixtures::{raw, recorded, recorded_with_metadata};
    use serde_json::json;

    fn user(position: i64, text: &str) -> crate::event::RecordedEvent {
        recorded(
            position,
            AgentEvent::UserMessageAdded(
                UserMessageData::new(text, "2025-06-01T12:00:00Z").unwrap(),
            ),
        )
    }

    fn assistant(
        position: i64,
        text: &str,
        tool_calls: Vec<ToolCall>,
    ) -> crate::event::RecordedEvent {
        recorded(
            position,
            AgentEvent::LlmResponseReceived(
                LlmResponseData::new(text, tool_calls, "test-model", TokenUsage::new(1, 1))
                    .unwrap(),
            ),
        )
    }

    #[test]
    fn simple_exchange() {
        let events = vec![
            recorded(0, AgentEvent::SessionStarted(SessionStartedData::new("t"))),
            user(1, "Hello"),
            assistant(2, "Hi!", vec![]),
        ];

        let context = project_llm_context(&events);
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].role, ChatRole::User);
        assert_eq!(context[0].text, "Hello");
        assert_eq!(context[1].role, ChatRole::Assistant);
        assert_eq!(context[1].text, "Hi!");
    }

    #[test]
    fn tool_chain_keeps_correlation_ids() {
        let call = ToolCall::new("call_1", "get_current_time", json!({}));
        let events = vec![
            user(0, "what time is it?"),
            assistant(1, "", vec![call]),
            recorded_with_metadata(
                2,
                AgentEvent::ToolExecutionCompleted(ToolCompletedData {
                    tool_name: "get_current_time".to_string(),
                    result: json!("2025-06-01T12:00:02+00:00"),
                    execution_time_ms: 0.4,
                }),
                json!({"tool_call_id": "call_1", "tool_index": 0}),
            ),
            assistant(3, "It is noon.", vec![]),
        ];

        let context = project_llm_context(&events);
        assert_eq!(context.len(), 4);
        assert_eq!(context[1].tool_calls.len(), 1);
        assert_eq!(context[2].role, ChatRole::Tool);
        assert_eq!(context[2].tool_call_id.as_deref(), Some("call_1"));
        // String results are passed through without extra JSON quoting.
        assert_eq!(context[2].text, "2025-06-01T12:00:02+00:00");
    }

    #[test]
    fn failed_tool_becomes_error_message() {
        let call = ToolCall::new("call_9", "calculate", json!({"expression": "1/0"}));
        let events = vec![
            user(0, "divide"),
            assistant(1, "", vec![call]),
            recorded_with_metadata(
                2,
                AgentEvent::ToolExecutionFailed(ToolFailedData {
                    tool_name: "calculate".to_string(),
                    error_message: "division by zero".to_string(),
                    retry_count: 0,
                }),
                json!({"tool_call_id": "call_9", "tool_index": 0}),
            ),
        ];

        let context = project_llm_context(&events);
        assert_eq!(context[2].role, ChatRole::Tool);
        assert_eq!(context[2].tool_call_id.as_deref(), Some("call_9"));
        assert!(context[2].text.contains("division by zero"));
    }

    #[test]
    fn non_string_results_are_serialized() {
        let events = vec![recorded_with_metadata(
            0,
            AgentEvent::ToolExecutionCompleted(ToolCompletedData {
                tool_name: "calculate".to_string(),
                result: json!(65.0),
                execution_time_ms: 0.1,
            }),
            json!({"tool_call_id": "c"}),
        )];
        let context = project_llm_context(&events);
        assert_eq!(context[0].text, "65.0");
    }

    #[test]
    fn lifecycle_and_unknown_events_are_skipped() {
        let events = vec![
            recorded(0, AgentEvent::SessionStarted(SessionStartedData::new("t"))),
            raw(1, "SomethingNew", json!({"x": 1})),
            raw(2, "UserMessageAdded", json!({"message": 42})),
            user(3, "hello"),
        ];
        let context = project_llm_context(&events);
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].text, "hello");
    }

    #[test]
    fn projection_is_deterministic() {
        let events = vec![
            user(0, "a"),
            assistant(1, "b", vec![]),
            user(2, "c"),
        ];
        assert_eq!(project_llm_context(&events), project_llm_context(&events));
    }

    #[test]
    fn helpers() {
        let events = vec![user(0, "first"), assistant(1, "r", vec![]), user(2, "second")];
        assert_eq!(last_user_message(&events).as_deref(), Some("second"));
        assert_eq!(count_conversation_turns(&events), 1);
        assert_eq!(last_user_message(&[]), None);
    }
}
