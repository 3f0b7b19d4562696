// Tool step
//
// Drains the pending tool calls from the latest model response, one at a
// time: request event, invocation, completion or failure event. The step is
// not atomic across calls: a crash mid-way leaves a request without its
// resolution, and the pending-calls projection brings the next pass right
// back here to finish the chain.

use serde_json::json;
use tracing::{info, warn};

use chronicle_core::event::{
    AgentEvent, ToolCompletedData, ToolFailedData, ToolRequestedData,
};
use chronicle_core::projections::project_pending_tool_calls;
use chronicle_core::tools::execute_tool;
use chronicle_core::{RecordedEvent, ToolRegistry};
use chronicle_store::EventStore;

use crate::cursor::StreamCursor;
use crate::error::EngineError;

/// Run one tool step. Returns `true` when every pending call completed
/// successfully.
pub async fn execute_tool_step(
    events: &[RecordedEvent],
    store: &dyn EventStore,
    registry: &ToolRegistry,
    cursor: &mut StreamCursor,
) -> Result<bool, EngineError> {
    let pending = project_pending_tool_calls(events);
    if pending.is_empty() {
        warn!(stream = %cursor.stream(), "tool step entered with no pending calls");
        return Ok(true);
    }

    info!(
        stream = %cursor.stream(),
        pending = pending.len(),
        "executing tool step"
    );

    let mut all_succeeded = true;

    for (index, call) in pending.iter().enumerate() {
        let metadata = json!({"tool_call_id": call.id, "tool_index": index});

        cursor
            .append(
                store,
                &AgentEvent::ToolExecutionRequested(ToolRequestedData {
                    tool_name: call.name.clone(),
                    arguments: call.arguments.clone(),
                }),
                metadata.clone(),
            )
            .await?;

        match execute_tool(&call.name, call.arguments.clone(), registry).await {
            Ok(outcome) if outcome.success => {
                info!(
                    stream = %cursor.stream(),
                    tool = %call.name,
                    execution_time_ms = outcome.execution_time_ms,
                    "tool completed"
                );
                cursor
                    .append(
                        store,
                        &AgentEvent::ToolExecutionCompleted(ToolCompletedData {
                            tool_name: outcome.tool_name,
                            result: outcome.result.unwrap_or(serde_json::Value::Null),
                            execution_time_ms: outcome.execution_time_ms,
                        }),
                        metadata,
                    )
                    .await?;
            }
            Ok(outcome) => {
                all_succeeded = false;
                let error_message = outcome
                    .error
                    .unwrap_or_else(|| "unknown tool error".to_string());
                warn!(stream = %cursor.stream(), tool = %call.name, %error_message, "tool failed");
                cursor
                    .append(
                        store,
                        &AgentEvent::ToolExecutionFailed(ToolFailedData {
                            tool_name: outcome.tool_name,
                            error_message,
                            retry_count: 0,
                        }),
                        metadata,
                    )
                    .await?;
            }
            Err(not_found) => {
                all_succeeded = false;
                warn!(stream = %cursor.stream(), tool = %call.name, "tool not registered");
                cursor
                    .append(
                        store,
                        &AgentEvent::ToolExecutionFailed(ToolFailedData {
                            tool_name: call.name.clone(),
                            error_message: not_found.to_string(),
                            retry_count: 0,
                        }),
                        metadata,
                    )
                    .await?;
            }
        }
    }

    Ok(all_succeeded)
}
