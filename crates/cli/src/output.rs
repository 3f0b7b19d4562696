// Output rendering
//
// Text for humans, JSON for scripts. The text view abbreviates event
// payloads to one line each unless --full is passed.

use clap::ValueEnum;
use serde_json::{json, Value};

use chronicle_core::event::AgentEvent;
use chronicle_core::projections::SessionState;
use chronicle_core::RecordedEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShowFormat {
    Text,
    Json,
}

/// Render a session's events in the chosen format.
pub fn render_events(events: &[RecordedEvent], format: ShowFormat, full: bool) -> String {
    match format {
        ShowFormat::Json => render_events_json(events, full),
        ShowFormat::Text => render_events_text(events, full),
    }
}

fn render_events_json(events: &[RecordedEvent], full: bool) -> String {
    let values: Vec<Value> = events
        .iter()
        .map(|event| {
            let mut value = json!({
                "position": event.position,
                "type": event.kind,
                "time": event.time.to_rfc3339(),
                "data": event.data,
            });
            if full {
                value["id"] = json!(event.id.to_string());
                value["stream_name"] = json!(event.stream_name);
                value["global_position"] = json!(event.global_position);
                value["metadata"] = event.metadata.clone();
            }
            value
        })
        .collect();
    serde_json::to_string_pretty(&values).unwrap_or_else(|_| "[]".to_string())
}

fn render_events_text(events: &[RecordedEvent], full: bool) -> String {
    let mut lines = Vec::with_capacity(events.len());
    for event in events {
        let summary = if full {
            event.data.to_string()
        } else {
            summarize(event)
        };
        lines.push(format!(
            "{:>4}  {}  {:<28} {}",
            event.position,
            event.time.format("%Y-%m-%d %H:%M:%S"),
            event.kind,
            summary
        ));
        if full && !event.metadata.is_null() && event.metadata != json!({}) {
            lines.push(format!("      metadata: {}", event.metadata));
        }
    }
    lines.join("\n")
}

fn summarize(event: &RecordedEvent) -> String {
    match event.payload() {
        AgentEvent::SessionStarted(data) => format!("thread {}", data.thread_id),
        AgentEvent::UserMessageAdded(data) => truncate(&data.message, 72),
        AgentEvent::LlmResponseReceived(data) => {
            if data.tool_calls.is_empty() {
                truncate(&data.response_text, 72)
            } else {
                let names: Vec<&str> =
                    data.tool_calls.iter().map(|c| c.name.as_str()).collect();
                format!("tool calls: {}", names.join(", "))
            }
        }
        AgentEvent::LlmCallFailed(data) => {
            format!("({} retries) {}", data.retry_count, truncate(&data.error_message, 56))
        }
        AgentEvent::ToolExecutionRequested(data) => data.tool_name,
        AgentEvent::ToolExecutionCompleted(data) => {
            format!("{} ({:.1} ms)", data.tool_name, data.execution_time_ms)
        }
        AgentEvent::ToolExecutionFailed(data) => {
            format!("{}: {}", data.tool_name, truncate(&data.error_message, 56))
        }
        AgentEvent::SessionTerminationRequested(data) => data.reason,
        AgentEvent::SessionCompleted(data) => data.completion_reason.to_string(),
        AgentEvent::Unknown { .. } => "(unknown event)".to_string(),
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}…")
    }
}

/// One-paragraph session summary printed after processing.
pub fn render_session_state(state: &SessionState) -> String {
    format!(
        "thread: {}\nstatus: {}\nuser messages: {}  llm calls: {}  tool calls: {}  errors: {}",
        state.thread_id,
        state.status,
        state.user_message_count,
        state.llm_call_count,
        state.tool_call_count,
        state.error_count,
    )
}

/// The assistant's latest reply, for printing after a turn.
pub fn final_response(events: &[RecordedEvent]) -> Option<String> {
    events.iter().rev().find_map(|event| match event.payload() {
        AgentEvent::LlmResponseReceived(data) if !data.response_text.is_empty() => {
            Some(data.response_text)
        }
        _ => None,
    })
}
