// Projections
//
// Pure, deterministic folds from an event sequence to a derived value. None
// of these touch I/O or the clock; identical inputs give identical outputs,
// which is what makes the engine replayable: any reader can rebuild the same
// state from the same stream.

mod llm_context;
mod next_step;
mod pending_tools;
mod session_state;

pub use llm_context::{count_conversation_turns, last_user_message, project_llm_context};
pub use next_step::{project_next_step, should_terminate, NextStep};
pub use pending_tools::{has_pending_tool_calls, pending_tool_call_named, project_pending_tool_calls};
pub use session_state::{
    project_session_state, SessionState, SessionStateError, SessionStatus,
};
