// Engine
//
// Session lifecycle plus the processing loop. One `process_thread` call is
// one pass: it owns the stream for its duration (enforced by the cursor's
// expected-version appends, not by locks) and leaves every outcome, from
// model replies and tool results to the terminal event, in the stream
// itself.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use chronicle_core::event::{
    AgentEvent, CompletionReason, SessionCompletedData, SessionStartedData, UserMessageData,
};
use chronicle_core::projections::{
    project_next_step, project_session_state, NextStep, SessionState,
};
use chronicle_core::{generate_thread_id, RecordedEvent, StreamName, ToolRegistry};
use chronicle_llm::LlmClient;
use chronicle_store::EventStore;

use crate::cancel::CancellationFlag;
use crate::config::EngineConfig;
use crate::cursor::{read_to_head, StreamCursor};
use crate::error::EngineError;
use crate::steps::{llm::execute_llm_step, tool::execute_tool_step};

/// The Chronicle processing engine.
///
/// Stateless between calls: everything it knows about a session it re-reads
/// from the stream, so any number of engine instances can serve the same
/// store.
pub struct Engine {
    store: Arc<dyn EventStore>,
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        store: Arc<dyn EventStore>,
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            llm,
            registry,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn EventStore {
        &*self.store
    }

    fn stream_for(&self, thread_id: &str) -> Result<StreamName, EngineError> {
        Ok(StreamName::new(
            &self.config.category,
            &self.config.version,
            thread_id,
        )?)
    }

    /// Start a new session: fresh thread id, `SessionStarted` (the stream
    /// must not exist yet), then the initial `UserMessageAdded`.
    pub async fn start_session(&self, initial_message: &str) -> Result<String, EngineError> {
        let user_message = UserMessageData::now(initial_message)?;

        let thread_id = generate_thread_id();
        let stream = self.stream_for(&thread_id)?;
        info!(%stream, "starting session");

        let mut cursor = StreamCursor::at(stream, -1);
        cursor
            .append(
                &*self.store,
                &AgentEvent::SessionStarted(SessionStartedData::new(&thread_id)),
                json!({}),
            )
            .await?;
        cursor
            .append(
                &*self.store,
                &AgentEvent::UserMessageAdded(user_message),
                json!({}),
            )
            .await?;

        Ok(thread_id)
    }

    /// Append a user message to an existing session.
    pub async fn add_user_message(
        &self,
        thread_id: &str,
        message: &str,
    ) -> Result<i64, EngineError> {
        let user_message = UserMessageData::now(message)?;
        let stream = self.stream_for(thread_id)?;

        let (events, mut cursor) = read_to_head(&*self.store, &stream).await?;
        if events.is_empty() {
            return Err(EngineError::session(format!(
                "session '{thread_id}' does not exist"
            )));
        }
        if events.last().is_some_and(RecordedEvent::is_terminal) {
            return Err(EngineError::session(format!(
                "session '{thread_id}' has already ended"
            )));
        }

        cursor
            .append(
                &*self.store,
                &AgentEvent::UserMessageAdded(user_message),
                json!({}),
            )
            .await
    }

    /// Append `SessionCompleted` with the given reason. Idempotent: a
    /// session whose last event is already terminal is left as it is.
    pub async fn terminate_session(
        &self,
        thread_id: &str,
        reason: CompletionReason,
    ) -> Result<(), EngineError> {
        let stream = self.stream_for(thread_id)?;
        let (events, mut cursor) = read_to_head(&*self.store, &stream).await?;

        if events.is_empty() {
            return Err(EngineError::session(format!(
                "session '{thread_id}' does not exist"
            )));
        }
        if events.last().is_some_and(RecordedEvent::is_terminal) {
            debug!(%stream, "session already terminal, nothing to do");
            return Ok(());
        }

        cursor
            .append(
                &*self.store,
                &AgentEvent::SessionCompleted(SessionCompletedData {
                    completion_reason: reason,
                }),
                json!({}),
            )
            .await?;
        info!(%stream, %reason, "session terminated");
        Ok(())
    }

    /// Process a thread until the next-step projection says to stop.
    pub async fn process_thread(&self, thread_id: &str) -> Result<SessionState, EngineError> {
        self.process_thread_with_cancel(thread_id, &CancellationFlag::new())
            .await
    }

    /// Like [`Engine::process_thread`], checking the cancellation flag
    /// between steps.
    pub async fn process_thread_with_cancel(
        &self,
        thread_id: &str,
        cancel: &CancellationFlag,
    ) -> Result<SessionState, EngineError> {
        let stream = self.stream_for(thread_id)?;
        info!(%stream, max_iterations = self.config.max_iterations, "processing thread");

        let mut events: Vec<RecordedEvent> = Vec::new();
        let mut cursor = StreamCursor::at(stream.clone(), -1);
        let mut next_read_from = 0i64;
        let mut terminated = false;
        let mut stopped_early = false;

        for iteration in 0..self.config.max_iterations {
            if cancel.is_cancelled() {
                info!(%stream, iteration, "cancellation requested, stopping pass");
                stopped_early = true;
                break;
            }

            // Incremental read: only what landed after the last accumulated
            // event. This also picks up what the previous iteration's step
            // appended, keeping the projections' view complete.
            let new_events = self
                .store
                .read_all(&stream.to_string(), next_read_from)
                .await?;
            if let Some(last) = new_events.last() {
                next_read_from = last.position + 1;
                cursor.observe(last.position);
            }
            events.extend(new_events);

            if events.is_empty() {
                return Err(EngineError::session(format!(
                    "no events found in stream '{stream}'"
                )));
            }

            let step = project_next_step(&events);
            debug!(%stream, iteration, %step, "determined next step");

            match step {
                NextStep::Termination => {
                    terminated = true;
                    break;
                }
                NextStep::LlmCall => {
                    let succeeded = execute_llm_step(
                        &events,
                        &*self.store,
                        &*self.llm,
                        &self.registry,
                        &mut cursor,
                        &self.config.system_prompt,
                        self.config.max_llm_retries,
                    )
                    .await?;
                    if !succeeded {
                        // The failure event is in the stream and the retry
                        // budget for this pass is spent. A later pass will be
                        // routed back to the LLM step and can try again.
                        warn!(%stream, iteration, "LLM step recorded a failure, ending pass");
                        stopped_early = true;
                        break;
                    }
                }
                NextStep::ToolExecution => {
                    execute_tool_step(&events, &*self.store, &self.registry, &mut cursor).await?;
                }
            }
        }

        if !terminated && !stopped_early {
            warn!(%stream, "iteration cap reached without a terminal event");
            cursor
                .append(
                    &*self.store,
                    &AgentEvent::SessionCompleted(SessionCompletedData {
                        completion_reason: CompletionReason::Timeout,
                    }),
                    json!({}),
                )
                .await?;
            return Err(EngineError::MaxIterationsExceeded(
                self.config.max_iterations,
            ));
        }

        // Final state comes from a clean re-read of the whole stream.
        let final_events = self.store.read_all(&stream.to_string(), 0).await?;
        let state = project_session_state(&final_events)?;
        info!(
            %stream,
            status = %state.status,
            llm_calls = state.llm_call_count,
            tool_calls = state.tool_call_count,
            "thread processing complete"
        );
        Ok(state)
    }
}
