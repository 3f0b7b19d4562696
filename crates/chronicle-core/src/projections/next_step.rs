// Next-step projection
//
// The step-selection state machine: the last event decides what the engine
// does next, with one tie-breaker: unresolved tool calls always pull the
// machine back to tool execution. Keeping the whole policy here means the
// engine never inspects events directly and behaves deterministically for a
// given stream.

use crate::event::{AgentEvent, RecordedEvent};
use crate::projections::pending_tools::project_pending_tool_calls;

/// What the engine should do next for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    LlmCall,
    ToolExecution,
    Termination,
}

impl std::fmt::Display for NextStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LlmCall => write!(f, "llm_call"),
            Self::ToolExecution => write!(f, "tool_execution"),
            Self::Termination => write!(f, "termination"),
        }
    }
}

/// Decide the next step from the stream's last event.
///
/// An empty stream yields `LlmCall`: forward progress over rejection, since a
/// freshly started session may be observed before its first events land.
/// Unknown kinds also default to `LlmCall` for the same reason.
pub fn project_next_step(events: &[RecordedEvent]) -> NextStep {
    let Some(last) = events.last() else {
        return NextStep::LlmCall;
    };

    match last.payload() {
        AgentEvent::UserMessageAdded(_) => NextStep::LlmCall,

        AgentEvent::LlmResponseReceived(data) => {
            if data.tool_calls.is_empty() {
                // The agent finished its turn; control returns to the caller.
                NextStep::Termination
            } else if project_pending_tool_calls(events).is_empty() {
                NextStep::LlmCall
            } else {
                NextStep::ToolExecution
            }
        }

        // The engine layer owns the retry budget; from the stream's point of
        // view a failed call just means the model still owes a response.
        AgentEvent::LlmCallFailed(_) => NextStep::LlmCall,

        AgentEvent::ToolExecutionRequested(_)
        | AgentEvent::ToolExecutionCompleted(_)
        | AgentEvent::ToolExecutionFailed(_) => {
            if project_pending_tool_calls(events).is_empty() {
                NextStep::LlmCall
            } else {
                NextStep::ToolExecution
            }
        }

        AgentEvent::SessionTerminationRequested(_) | AgentEvent::SessionCompleted(_) => {
            NextStep::Termination
        }

        AgentEvent::SessionStarted(_) | AgentEvent::Unknown { .. } => NextStep::LlmCall,
    }
}

/// Convenience check used by callers that only care about stopping.
pub fn should_terminate(events: &[RecordedEvent]) -> bool {
    project_next_step(events) == NextStep::Termination
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        AgentEvent, CompletionReason, LlmCallFailedData, LlmResponseData, SessionCompletedData,
        SessionStartedData, TerminationRequestedData, TokenUsage, ToolCall, ToolCompletedData,
        ToolFailedData, ToolRequestedData, UserMessageData,
    };
    use crate::projections::fixtures::{raw, recorded, recorded_with_metadata};
    use serde_json::json;

    fn user(position: i64) -> RecordedEvent {
        recorded(
            position,
            AgentEvent::UserMessageAdded(
                UserMessageData::new("hi", "2025-06-01T12:00:00Z").unwrap(),
            ),
        )
    }

    fn response(position: i64, text: &str, calls: Vec<ToolCall>) -> RecordedEvent {
        recorded(
            position,
            AgentEvent::LlmResponseReceived(
                LlmResponseData::new(text, calls, "test-model", TokenUsage::default()).unwrap(),
            ),
        )
    }

    fn completed(position: i64, call_id: &str) -> RecordedEvent {
        recorded_with_metadata(
            position,
            AgentEvent::ToolExecutionCompleted(ToolCompletedData {
                tool_name: "echo".to_string(),
                result: json!("ok"),
                execution_time_ms: 1.0,
            }),
            json!({"tool_call_id": call_id}),
        )
    }

    fn failed(position: i64, call_id: &str) -> RecordedEvent {
        recorded_with_metadata(
            position,
            AgentEvent::ToolExecutionFailed(ToolFailedData {
                tool_name: "echo".to_string(),
                error_message: "boom".to_string(),
                retry_count: 0,
            }),
            json!({"tool_call_id": call_id}),
        )
    }

    #[test]
    fn empty_stream_moves_forward() {
        assert_eq!(project_next_step(&[]), NextStep::LlmCall);
    }

    #[test]
    fn session_started_moves_forward() {
        let events = vec![recorded(
            0,
            AgentEvent::SessionStarted(SessionStartedData::new("t")),
        )];
        assert_eq!(project_next_step(&events), NextStep::LlmCall);
    }

    #[test]
    fn user_message_calls_llm() {
        assert_eq!(project_next_step(&[user(0)]), NextStep::LlmCall);
    }

    #[test]
    fn response_without_tool_calls_terminates() {
        let events = vec![user(0), response(1, "Hi!", vec![])];
        assert_eq!(project_next_step(&events), NextStep::Termination);
        assert!(should_terminate(&events));
    }

    #[test]
    fn response_with_tool_calls_executes_tools() {
        let events = vec![
            user(0),
            response(1, "", vec![ToolCall::new("c1", "echo", json!({}))]),
        ];
        assert_eq!(project_next_step(&events), NextStep::ToolExecution);
    }

    #[test]
    fn resolved_tools_hand_back_to_llm() {
        let events = vec![
            user(0),
            response(1, "", vec![ToolCall::new("c1", "echo", json!({}))]),
            completed(2, "c1"),
        ];
        assert_eq!(project_next_step(&events), NextStep::LlmCall);
    }

    #[test]
    fn tool_failure_also_hands_back_to_llm() {
        let events = vec![
            user(0),
            response(1, "", vec![ToolCall::new("c1", "echo", json!({}))]),
            failed(2, "c1"),
        ];
        assert_eq!(project_next_step(&events), NextStep::LlmCall);
    }

    #[test]
    fn remaining_calls_keep_executing_tools() {
        let events = vec![
            user(0),
            response(
                1,
                "",
                vec![
                    ToolCall::new("c1", "echo", json!({})),
                    ToolCall::new("c2", "echo", json!({})),
                ],
            ),
            completed(2, "c1"),
        ];
        assert_eq!(project_next_step(&events), NextStep::ToolExecution);
    }

    #[test]
    fn interrupted_request_resumes_tool_execution() {
        let events = vec![
            response(0, "", vec![ToolCall::new("c1", "echo", json!({}))]),
            recorded_with_metadata(
                1,
                AgentEvent::ToolExecutionRequested(ToolRequestedData {
                    tool_name: "echo".to_string(),
                    arguments: json!({}),
                }),
                json!({"tool_call_id": "c1", "tool_index": 0}),
            ),
        ];
        assert_eq!(project_next_step(&events), NextStep::ToolExecution);
    }

    #[test]
    fn llm_failure_retries_at_engine_level() {
        let events = vec![
            user(0),
            recorded(
                1,
                AgentEvent::LlmCallFailed(LlmCallFailedData {
                    error_message: "rate limited".to_string(),
                    retry_count: 2,
                }),
            ),
        ];
        assert_eq!(project_next_step(&events), NextStep::LlmCall);
    }

    #[test]
    fn terminal_events_terminate() {
        let requested = vec![recorded(
            0,
            AgentEvent::SessionTerminationRequested(TerminationRequestedData::default()),
        )];
        assert_eq!(project_next_step(&requested), NextStep::Termination);

        let completed = vec![recorded(
            0,
            AgentEvent::SessionCompleted(SessionCompletedData {
                completion_reason: CompletionReason::Success,
            }),
        )];
        assert_eq!(project_next_step(&completed), NextStep::Termination);
    }

    #[test]
    fn unknown_kind_moves_forward() {
        let events = vec![raw(0, "SomethingNew", json!({}))];
        assert_eq!(project_next_step(&events), NextStep::LlmCall);
    }
}
