// Pending tool-calls projection
//
// Finds the most recent LLMResponseReceived and returns the tool calls from
// it that have not yet been answered by a ToolExecutionCompleted or
// ToolExecutionFailed appearing after that response (matched on the
// tool_call_id metadata). This is the tie-breaker that pulls the engine back
// into tool execution after a crash mid-step.

use std::collections::HashSet;

use crate::event::{AgentEvent, RecordedEvent, ToolCall};

/// Tool calls from the latest model response that still need executing.
///
/// Returns an empty list when the stream has no model response yet or every
/// call from the latest response has a matching completion or failure.
pub fn project_pending_tool_calls(events: &[RecordedEvent]) -> Vec<ToolCall> {
    // Index of the latest response, and its calls.
    let Some((response_index, tool_calls)) =
        events.iter().enumerate().rev().find_map(|(index, event)| {
            match event.payload() {
                AgentEvent::LlmResponseReceived(data) => Some((index, data.tool_calls)),
                _ => None,
            }
        })
    else {
        return Vec::new();
    };

    if tool_calls.is_empty() {
        return Vec::new();
    }

    // Only resolutions written after the response count; ids from an earlier
    // tool chain must not mask this one.
    let resolved: HashSet<&str> = events[response_index + 1..]
        .iter()
        .filter(|event| {
            matches!(
                event.payload(),
                AgentEvent::ToolExecutionCompleted(_) | AgentEvent::ToolExecutionFailed(_)
            )
        })
        .filter_map(|event| event.tool_call_id())
        .collect();

    tool_calls
        .into_iter()
        .filter(|call| !resolved.contains(call.id.as_str()))
        .collect()
}

/// True when at least one tool call is still unresolved.
pub fn has_pending_tool_calls(events: &[RecordedEvent]) -> bool {
    !project_pending_tool_calls(events).is_empty()
}

/// The first still-pending call for a given tool, if any.
pub fn pending_tool_call_named(events: &[RecordedEvent], tool_name: &str) -> Option<ToolCall> {
    project_pending_tool_calls(events)
        .into_iter()
        .find(|call| call.name == tool_name)
}
