// Session-state projection
//
// Aggregates a whole stream in one pass: status, activity counters, and the
// session's start/last/end instants. The thread id comes from the stream
// name of the first event, so the state is self-describing for UIs and the
// CLI without a second lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{AgentEvent, CompletionReason, RecordedEvent};
use crate::stream::StreamName;

/// Status of a session as derived from its stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
    Terminated,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// Point-in-time snapshot of a session, derived entirely from its events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub thread_id: String,
    pub status: SessionStatus,
    pub user_message_count: u64,
    pub llm_call_count: u64,
    pub tool_call_count: u64,
    pub error_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_activity_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Seconds from session start to its end (or to the last activity while
    /// still running). `None` before the `SessionStarted` event is seen.
    pub fn duration_seconds(&self) -> Option<f64> {
        let start = self.started_at?;
        let end = self.ended_at.unwrap_or(self.last_activity_at);
        Some((end - start).num_milliseconds() as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionStateError {
    #[error("cannot project session state from an empty stream")]
    EmptyStream,

    #[error("cannot derive a thread id from stream name '{0}'")]
    BadStreamName(String),
}

/// Fold the stream into a [`SessionState`].
pub fn project_session_state(events: &[RecordedEvent]) -> Result<SessionState, SessionStateError> {
    let first = events.first().ok_or(SessionStateError::EmptyStream)?;
    let thread_id = StreamName::parse(&first.stream_name)
        .map(|name| name.thread_id().to_string())
        .map_err(|_| SessionStateError::BadStreamName(first.stream_name.clone()))?;

    let mut user_message_count = 0u64;
    let mut llm_call_count = 0u64;
    let mut tool_call_count = 0u64;
    let mut error_count = 0u64;
    let mut started_at = None;
    let mut ended_at = None;
    let mut completion_reason: Option<CompletionReason> = None;
    let mut termination_requested = false;
    let last_activity_at = events.last().map(|e| e.time).unwrap_or(first.time);

    for event in events {
        match event.payload() {
            AgentEvent::SessionStarted(_) => started_at = Some(event.time),
            AgentEvent::UserMessageAdded(_) => user_message_count += 1,
            AgentEvent::LlmResponseReceived(_) => llm_call_count += 1,
            AgentEvent::ToolExecutionCompleted(_) => tool_call_count += 1,
            AgentEvent::LlmCallFailed(_) | AgentEvent::ToolExecutionFailed(_) => error_count += 1,
            AgentEvent::SessionTerminationRequested(_) => termination_requested = true,
            AgentEvent::SessionCompleted(data) => {
                ended_at = Some(event.time);
                completion_reason = Some(data.completion_reason);
            }
            _ => {}
        }
    }

    // Active until a terminal event lands; errors alone do not end a session.
    let status = match completion_reason {
        Some(CompletionReason::Success) => SessionStatus::Completed,
        Some(CompletionReason::UserTerminated) => SessionStatus::Terminated,
        Some(CompletionReason::Failure) | Some(CompletionReason::Timeout) => SessionStatus::Failed,
        None if termination_requested => SessionStatus::Terminated,
        None => SessionStatus::Active,
    };

    Ok(SessionState {
        thread_id,
        status,
        user_message_count,
        llm_call_count,
        tool_call_count,
        error_count,
        started_at,
        last_activity_at,
        ended_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{
        AgentEvent, LlmCallFailedData, LlmResponseData, SessionCompletedData, SessionStartedData,
        TerminationRequestedData, TokenUsage, ToolCompletedData, UserMessageData,
    };
    use crate::projections::fixtures::recorded;

    fn started(position: i64) -> RecordedEvent {
        recorded(
            position,
            AgentEvent::SessionStarted(SessionStartedData::new("t")),
        )
    }

    fn user(position: i64) -> RecordedEvent {
        recorded(
            position,
            AgentEvent::UserMessageAdded(
                UserMessageData::new("hi", "2025-06-01T12:00:00Z").unwrap(),
            ),
        )
    }

    fn response(position: i64) -> RecordedEvent {
        recorded(
            position,
            AgentEvent::LlmResponseReceived(
                LlmResponseData::new("ok", vec![], "test-model", TokenUsage::default()).unwrap(),
            ),
        )
    }

    fn completed(position: i64, reason: CompletionReason) -> RecordedEvent {
        recorded(
            position,
            AgentEvent::SessionCompleted(SessionCompletedData {
                completion_reason: reason,
            }),
        )
    }

    #[test]
    fn empty_stream_is_an_error() {
        assert_eq!(
            project_session_state(&[]).unwrap_err(),
            SessionStateError::EmptyStream
        );
    }

    #[test]
    fn active_session_counts() {
        let events = vec![
            started(0),
            user(1),
            response(2),
            recorded(
                3,
                AgentEvent::ToolExecutionCompleted(ToolCompletedData {
                    tool_name: "echo".to_string(),
                    result: serde_json::json!("ok"),
                    execution_time_ms: 1.0,
                }),
            ),
            recorded(
                4,
                AgentEvent::LlmCallFailed(LlmCallFailedData {
                    error_message: "x".to_string(),
                    retry_count: 2,
                }),
            ),
        ];

        let state = project_session_state(&events).unwrap();
        assert_eq!(state.thread_id, "7a1d2c3b-0000-4000-8000-000000000001");
        assert_eq!(state.status, SessionStatus::Active);
        assert!(state.is_active());
        assert_eq!(state.user_message_count, 1);
        assert_eq!(state.llm_call_count, 1);
        assert_eq!(state.tool_call_count, 1);
        assert_eq!(state.error_count, 1);
        assert!(state.started_at.is_some());
        assert!(state.ended_at.is_none());
    }

    #[test]
    fn completion_reasons_map_to_statuses() {
        let base = vec![started(0), user(1), response(2)];
        let cases = [
            (CompletionReason::Success, SessionStatus::Completed),
            (CompletionReason::Failure, SessionStatus::Failed),
            (CompletionReason::Timeout, SessionStatus::Failed),
            (CompletionReason::UserTerminated, SessionStatus::Terminated),
        ];
        for (reason, expected) in cases {
            let mut events = base.clone();
            events.push(completed(3, reason));
            let state = project_session_state(&events).unwrap();
            assert_eq!(state.status, expected, "for {reason}");
            assert!(state.ended_at.is_some());
        }
    }

    #[test]
    fn termination_request_without_completion_is_terminated() {
        let events = vec![
            started(0),
            user(1),
            recorded(
                2,
                AgentEvent::SessionTerminationRequested(TerminationRequestedData::default()),
            ),
        ];
        let state = project_session_state(&events).unwrap();
        assert_eq!(state.status, SessionStatus::Terminated);
    }

    #[test]
    fn duration_uses_end_or_last_activity() {
        let active = vec![started(0), user(5)];
        let state = project_session_state(&active).unwrap();
        assert_eq!(state.duration_seconds(), Some(5.0));

        let done = vec![started(0), user(1), response(2), completed(9, CompletionReason::Success)];
        let state = project_session_state(&done).unwrap();
        assert_eq!(state.duration_seconds(), Some(9.0));
    }
}
