// Event model
//
// Every event stored in a stream is an envelope (`RecordedEvent`) carrying an
// opaque JSON `data` payload keyed by a kind string. The typed payload
// structs below give each kind a validated construction path and a stable
// JSON shape; `AgentEvent` is the sum over the known kinds. Unknown kinds
// read from the store decode to `AgentEvent::Unknown` instead of failing, so
// old readers survive new writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Kind tags
// ============================================================================

pub const SESSION_STARTED: &str = "SessionStarted";
pub const USER_MESSAGE_ADDED: &str = "UserMessageAdded";
pub const LLM_RESPONSE_RECEIVED: &str = "LLMResponseReceived";
pub const LLM_CALL_FAILED: &str = "LLMCallFailed";
pub const TOOL_EXECUTION_REQUESTED: &str = "ToolExecutionRequested";
pub const TOOL_EXECUTION_COMPLETED: &str = "ToolExecutionCompleted";
pub const TOOL_EXECUTION_FAILED: &str = "ToolExecutionFailed";
pub const SESSION_TERMINATION_REQUESTED: &str = "SessionTerminationRequested";
pub const SESSION_COMPLETED: &str = "SessionCompleted";

/// Error constructing or serializing an event payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("user message cannot be empty")]
    EmptyMessage,

    #[error("timestamp must be RFC 3339, got '{0}'")]
    InvalidTimestamp(String),

    #[error("LLM response must carry text or at least one tool call")]
    EmptyLlmResponse,

    #[error("model name cannot be empty")]
    EmptyModelName,

    #[error("tool name cannot be empty")]
    EmptyToolName,

    #[error("payload serialization failed: {0}")]
    Serialization(String),
}

// ============================================================================
// Envelope
// ============================================================================

/// A single event as read from the store.
///
/// Positions are 0-based and contiguous per stream; `global_position` orders
/// events across all streams. `data` and `metadata` stay as raw JSON here;
/// use [`RecordedEvent::payload`] for the typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub id: Uuid,
    pub stream_name: String,
    pub kind: String,
    pub position: i64,
    pub global_position: i64,
    pub data: Value,
    pub metadata: Value,
    pub time: DateTime<Utc>,
}

impl RecordedEvent {
    /// Decode the typed payload for this event. Unknown kinds and payloads
    /// that no longer match their kind's shape come back as
    /// [`AgentEvent::Unknown`] rather than an error.
    pub fn payload(&self) -> AgentEvent {
        AgentEvent::from_parts(&self.kind, self.data.clone())
    }

    /// The `tool_call_id` correlation key from this event's metadata, if any.
    pub fn tool_call_id(&self) -> Option<&str> {
        self.metadata.get("tool_call_id").and_then(Value::as_str)
    }

    /// True for the kinds that end a session.
    pub fn is_terminal(&self) -> bool {
        self.kind == SESSION_COMPLETED || self.kind == SESSION_TERMINATION_REQUESTED
    }
}

// ============================================================================
// Shared value types
// ============================================================================

/// A tool invocation requested by the model. `id` is unique within one
/// response and correlates the later execution events via metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Token accounting for one LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input,
            output,
            total: input + output,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Success,
    Failure,
    Timeout,
    UserTerminated,
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Timeout => write!(f, "timeout"),
            Self::UserTerminated => write!(f, "user_terminated"),
        }
    }
}

// ============================================================================
// Typed payloads
// ============================================================================

/// `SessionStarted`: always the first event of a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStartedData {
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_context: Option<Value>,
}

impl SessionStartedData {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            initial_context: None,
        }
    }
}

/// `UserMessageAdded`: one user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessageData {
    pub message: String,
    pub timestamp: String,
}

impl UserMessageData {
    /// Validated constructor: the message must be non-blank and the
    /// timestamp RFC 3339.
    pub fn new(message: impl Into<String>, timestamp: impl Into<String>) -> Result<Self, EventError> {
        let message = message.into();
        let timestamp = timestamp.into();
        if message.trim().is_empty() {
            return Err(EventError::EmptyMessage);
        }
        if DateTime::parse_from_rfc3339(&timestamp).is_err() {
            return Err(EventError::InvalidTimestamp(timestamp));
        }
        Ok(Self { message, timestamp })
    }

    /// Convenience constructor stamping the current instant.
    pub fn now(message: impl Into<String>) -> Result<Self, EventError> {
        Self::new(message, Utc::now().to_rfc3339())
    }
}

/// `LLMResponseReceived`: a completed model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponseData {
    pub response_text: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub model_name: String,
    #[serde(default)]
    pub token_usage: TokenUsage,
}

impl LlmResponseData {
    /// Validated constructor: a response with neither text nor tool calls is
    /// malformed, and the model name must be present.
    pub fn new(
        response_text: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        model_name: impl Into<String>,
        token_usage: TokenUsage,
    ) -> Result<Self, EventError> {
        let response_text = response_text.into();
        let model_name = model_name.into();
        if response_text.trim().is_empty() && tool_calls.is_empty() {
            return Err(EventError::EmptyLlmResponse);
        }
        if model_name.trim().is_empty() {
            return Err(EventError::EmptyModelName);
        }
        Ok(Self {
            response_text,
            tool_calls,
            model_name,
            token_usage,
        })
    }
}

/// `LLMCallFailed`: the retry budget is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmCallFailedData {
    pub error_message: String,
    pub retry_count: u32,
}

/// `ToolExecutionRequested`: written once per tool call, before invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequestedData {
    pub tool_name: String,
    pub arguments: Value,
}

/// `ToolExecutionCompleted`: a successful invocation with its timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCompletedData {
    pub tool_name: String,
    pub result: Value,
    pub execution_time_ms: f64,
}

/// `ToolExecutionFailed`: the invocation raised or the tool was unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailedData {
    pub tool_name: String,
    pub error_message: String,
    pub retry_count: u32,
}

/// `SessionTerminationRequested`: an explicit stop from outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminationRequestedData {
    #[serde(default = "TerminationRequestedData::default_reason")]
    pub reason: String,
}

impl TerminationRequestedData {
    fn default_reason() -> String {
        "user_request".to_string()
    }
}

impl Default for TerminationRequestedData {
    fn default() -> Self {
        Self {
            reason: Self::default_reason(),
        }
    }
}

/// `SessionCompleted`: the terminal event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCompletedData {
    pub completion_reason: CompletionReason,
}

// ============================================================================
// Sum type over the known kinds
// ============================================================================

/// Typed view over an event payload.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    SessionStarted(SessionStartedData),
    UserMessageAdded(UserMessageData),
    LlmResponseReceived(LlmResponseData),
    LlmCallFailed(LlmCallFailedData),
    ToolExecutionRequested(ToolRequestedData),
    ToolExecutionCompleted(ToolCompletedData),
    ToolExecutionFailed(ToolFailedData),
    SessionTerminationRequested(TerminationRequestedData),
    SessionCompleted(SessionCompletedData),
    /// A kind this build does not know, or a known kind whose payload no
    /// longer deserializes. Carried opaquely so readers keep working.
    Unknown { kind: String, data: Value },
}

impl AgentEvent {
    /// The kind tag written to the store for this payload.
    pub fn kind(&self) -> &str {
        match self {
            Self::SessionStarted(_) => SESSION_STARTED,
            Self::UserMessageAdded(_) => USER_MESSAGE_ADDED,
            Self::LlmResponseReceived(_) => LLM_RESPONSE_RECEIVED,
            Self::LlmCallFailed(_) => LLM_CALL_FAILED,
            Self::ToolExecutionRequested(_) => TOOL_EXECUTION_REQUESTED,
            Self::ToolExecutionCompleted(_) => TOOL_EXECUTION_COMPLETED,
            Self::ToolExecutionFailed(_) => TOOL_EXECUTION_FAILED,
            Self::SessionTerminationRequested(_) => SESSION_TERMINATION_REQUESTED,
            Self::SessionCompleted(_) => SESSION_COMPLETED,
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Serialize the payload back to the JSON written as the event `data`.
    pub fn to_data(&self) -> Result<Value, EventError> {
        let result = match self {
            Self::SessionStarted(d) => serde_json::to_value(d),
            Self::UserMessageAdded(d) => serde_json::to_value(d),
            Self::LlmResponseReceived(d) => serde_json::to_value(d),
            Self::LlmCallFailed(d) => serde_json::to_value(d),
            Self::ToolExecutionRequested(d) => serde_json::to_value(d),
            Self::ToolExecutionCompleted(d) => serde_json::to_value(d),
            Self::ToolExecutionFailed(d) => serde_json::to_value(d),
            Self::SessionTerminationRequested(d) => serde_json::to_value(d),
            Self::SessionCompleted(d) => serde_json::to_value(d),
            Self::Unknown { data, .. } => Ok(data.clone()),
        };
        result.map_err(|e| EventError::Serialization(e.to_string()))
    }

    /// Decode a `(kind, data)` pair read from the store. Anything that does
    /// not decode cleanly comes back as [`AgentEvent::Unknown`].
    pub fn from_parts(kind: &str, data: Value) -> Self {
        fn decode<T, F>(kind: &str, data: Value, wrap: F) -> AgentEvent
        where
            T: serde::de::DeserializeOwned,
            F: FnOnce(T) -> AgentEvent,
        {
            match serde_json::from_value::<T>(data.clone()) {
                Ok(payload) => wrap(payload),
                Err(_) => AgentEvent::Unknown {
                    kind: kind.to_string(),
                    data,
                },
            }
        }

        match kind {
            SESSION_STARTED => decode(kind, data, AgentEvent::SessionStarted),
            USER_MESSAGE_ADDED => decode(kind, data, AgentEvent::UserMessageAdded),
            LLM_RESPONSE_RECEIVED => decode(kind, data, AgentEvent::LlmResponseReceived),
            LLM_CALL_FAILED => decode(kind, data, AgentEvent::LlmCallFailed),
            TOOL_EXECUTION_REQUESTED => decode(kind, data, AgentEvent::ToolExecutionRequested),
            TOOL_EXECUTION_COMPLETED => decode(kind, data, AgentEvent::ToolExecutionCompleted),
            TOOL_EXECUTION_FAILED => decode(kind, data, AgentEvent::ToolExecutionFailed),
            SESSION_TERMINATION_REQUESTED => {
                decode(kind, data, AgentEvent::SessionTerminationRequested)
            }
            SESSION_COMPLETED => decode(kind, data, AgentEvent::SessionCompleted),
            _ => AgentEvent::Unknown {
                kind: kind.to_string(),
                data,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_message_validation() {
        assert_eq!(
            UserMessageData::new("  ", "2025-01-01T00:00:00Z").unwrap_err(),
            EventError::EmptyMessage
        );
        assert!(matches!(
            UserMessageData::new("hi", "yesterday").unwrap_err(),
            EventError::InvalidTimestamp(_)
        ));
        let data = UserMessageData::now("hi").unwrap();
        assert_eq!(data.message, "hi");
        assert!(DateTime::parse_from_rfc3339(&data.timestamp).is_ok());
    }

    #[test]
    fn llm_response_requires_text_or_tool_calls() {
        assert_eq!(
            LlmResponseData::new("", vec![], "m", TokenUsage::default()).unwrap_err(),
            EventError::EmptyLlmResponse
        );

        let only_tools = LlmResponseData::new(
            "",
            vec![ToolCall::new("c1", "echo", json!({"message": "x"}))],
            "m",
            TokenUsage::new(10, 2),
        )
        .unwrap();
        assert!(only_tools.response_text.is_empty());
        assert_eq!(only_tools.token_usage.total, 12);

        assert_eq!(
            LlmResponseData::new("hi", vec![], "", TokenUsage::default()).unwrap_err(),
            EventError::EmptyModelName
        );
    }

    #[test]
    fn completion_reason_wire_format() {
        assert_eq!(
            serde_json::to_value(CompletionReason::UserTerminated).unwrap(),
            json!("user_terminated")
        );
        assert_eq!(
            serde_json::from_value::<CompletionReason>(json!("timeout")).unwrap(),
            CompletionReason::Timeout
        );
    }

    #[test]
    fn payload_round_trips_through_data() {
        let event = AgentEvent::LlmResponseReceived(
            LlmResponseData::new(
                "hello",
                vec![ToolCall::new("c1", "calculate", json!({"expression": "1+1"}))],
                "test-model",
                TokenUsage::new(5, 7),
            )
            .unwrap(),
        );

        let data = event.to_data().unwrap();
        let decoded = AgentEvent::from_parts(event.kind(), data);
        assert_eq!(decoded, event);
    }

    #[test]
    fn unknown_kinds_decode_opaquely() {
        let data = json!({"anything": [1, 2, 3]});
        let event = AgentEvent::from_parts("SomethingNew", data.clone());
        match &event {
            AgentEvent::Unknown { kind, data: held } => {
                assert_eq!(kind, "SomethingNew");
                assert_eq!(held, &data);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
        assert_eq!(event.to_data().unwrap(), data);
    }

    #[test]
    fn malformed_known_kind_decodes_as_unknown() {
        let event = AgentEvent::from_parts(USER_MESSAGE_ADDED, json!({"message": 42}));
        assert!(matches!(event, AgentEvent::Unknown { .. }));
    }

    #[test]
    fn terminal_detection_on_envelope() {
        let event = RecordedEvent {
            id: Uuid::new_v4(),
            stream_name: "agent:v0-t".to_string(),
            kind: SESSION_COMPLETED.to_string(),
            position: 3,
            global_position: 40,
            data: json!({"completion_reason": "success"}),
            metadata: json!({}),
            time: Utc::now(),
        };
        assert!(event.is_terminal());
    }
}
