// Chronicle core types
//
// This crate holds everything that is pure and shared across the runtime:
// - The event model: typed payloads per event kind plus the universal envelope
// - Stream naming ({category}:{version}-{threadId})
// - Projections: pure folds from event sequences to derived state
// - The tool framework: registry, executor, and the built-in tools
// - Chat-message types consumed by the LLM adapters
//
// Nothing in here performs I/O. The store, engine, and LLM crates build on
// these types; tests for the decision logic live here and run without a
// database or network.

pub mod chat;
pub mod event;
pub mod projections;
pub mod stream;
pub mod tools;

pub use chat::{ChatMessage, ChatRole};
pub use event::{
    AgentEvent, CompletionReason, EventError, LlmCallFailedData, LlmResponseData, RecordedEvent,
    SessionCompletedData, SessionStartedData, TerminationRequestedData, TokenUsage, ToolCall,
    ToolCompletedData, ToolFailedData, ToolRequestedData, UserMessageData,
};
pub use stream::{generate_thread_id, StreamName, StreamNameError, DEFAULT_CATEGORY, DEFAULT_VERSION};
pub use tools::{
    execute_tool, ExecutionOutcome, Tool, ToolDeclaration, ToolError, ToolNotFound, ToolRegistry,
    ToolRegistryBuilder,
};
