// LLM step
//
// Project the stream to chat context, call the model, and append either
// `LLMResponseReceived` or, once the retry budget is spent, one
// `LLMCallFailed`. Retrying is ephemeral: nothing is written between
// attempts, so a transient provider hiccup leaves no trace in the stream.

use serde_json::json;
use tracing::{debug, info, warn};

use chronicle_core::event::{AgentEvent, LlmCallFailedData, LlmResponseData};
use chronicle_core::projections::project_llm_context;
use chronicle_core::{RecordedEvent, ToolRegistry};
use chronicle_llm::{LlmClient, LlmError};
use chronicle_store::EventStore;

use crate::cursor::StreamCursor;
use crate::error::EngineError;

/// Run one LLM step. Returns `true` when a response event was appended,
/// `false` when the step ended in an `LLMCallFailed` event.
pub async fn execute_llm_step(
    events: &[RecordedEvent],
    store: &dyn EventStore,
    llm: &dyn LlmClient,
    registry: &ToolRegistry,
    cursor: &mut StreamCursor,
    system_prompt: &str,
    max_retries: u32,
) -> Result<bool, EngineError> {
    let context = project_llm_context(events);
    let declarations = registry.declarations();
    debug!(
        stream = %cursor.stream(),
        context_len = context.len(),
        tools = declarations.len(),
        "executing LLM step"
    );

    let mut attempt: u32 = 0;
    loop {
        let outcome = llm
            .call(&context, &declarations, Some(system_prompt))
            .await
            .and_then(|completion| {
                // An empty completion is malformed provider output and goes
                // through the same retry budget as a parse failure.
                LlmResponseData::new(
                    completion.response_text,
                    completion.tool_calls,
                    completion.model_name,
                    completion.token_usage,
                )
                .map_err(|e| LlmError::response(e.to_string()))
            });

        match outcome {
            Ok(response) => {
                info!(
                    stream = %cursor.stream(),
                    tool_calls = response.tool_calls.len(),
                    model = %response.model_name,
                    "LLM call succeeded"
                );
                cursor
                    .append(
                        store,
                        &AgentEvent::LlmResponseReceived(response),
                        json!({"retry_count": attempt}),
                    )
                    .await?;
                return Ok(true);
            }
            Err(err) if err.is_retriable() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    stream = %cursor.stream(),
                    attempt,
                    error = %err,
                    "LLM call failed, retrying"
                );
            }
            Err(err) => {
                warn!(
                    stream = %cursor.stream(),
                    retry_count = attempt,
                    error = %err,
                    "LLM call failed after exhausting retries"
                );
                cursor
                    .append(
                        store,
                        &AgentEvent::LlmCallFailed(LlmCallFailedData {
                            error_message: err.to_string(),
                            retry_count: attempt,
                        }),
                        json!({"error_kind": error_kind(&err)}),
                    )
                    .await?;
                return Ok(false);
            }
        }
    }
}

fn error_kind(err: &LlmError) -> &'static str {
    match err {
        LlmError::Api(_) => "api",
        LlmError::Response(_) => "response",
        LlmError::Other(_) => "other",
    }
}
