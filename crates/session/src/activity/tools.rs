//! Tool-execution batch (§4.7.3): resolve every call against the active
//! agent's `ToolContext`, run them concurrently, and reconcile the result
//! into chat-ctx outputs plus at most one handoff.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use va_domain::chat::FunctionCallOutput;
use va_domain::ids::new_id;
use va_domain::tool::{HandoffRecord, RunContext, ToolCallArgs, ToolContext, ToolOutcome};

pub struct ToolBatchResult {
    /// One output per input call, in the same order — #calls == #outputs
    /// holds even when a call errored or was replaced by a handoff conflict.
    pub outputs: Vec<FunctionCallOutput>,
    /// At most one; the first `handoff` outcome encountered in call order.
    pub handoff: Option<HandoffRecord>,
}

async fn run_one(
    tool_ctx: &ToolContext,
    call: &ToolCallArgs,
    abort_signal: CancellationToken,
    user_data: Option<Arc<serde_json::Value>>,
) -> Result<ToolOutcome, String> {
    let Some(tool) = tool_ctx.get(&call.tool_name) else {
        return Err(format!("unknown tool '{}'", call.tool_name));
    };
    let ctx = RunContext {
        tool_call_id: call.call_id.clone(),
        abort_signal,
        user_data,
    };
    tool.executor
        .execute(ctx, call)
        .await
        .map_err(|e| e.to_string())
}

/// Executes every call in `calls` concurrently. `user_data` is shared,
/// opaque session state passed through to each tool untouched.
pub async fn execute_tool_batch(
    tool_ctx: &ToolContext,
    calls: &[ToolCallArgs],
    abort_signal: CancellationToken,
    user_data: Option<Arc<serde_json::Value>>,
) -> ToolBatchResult {
    let futures = calls.iter().map(|call| {
        let abort_signal = abort_signal.clone();
        let user_data = user_data.clone();
        async move { run_one(tool_ctx, call, abort_signal, user_data).await }
    });
    let results = futures_util::future::join_all(futures).await;

    let mut outputs = Vec::with_capacity(calls.len());
    let mut handoff = None;
    for (call, result) in calls.iter().zip(results) {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(message) => {
                tracing::warn!(tool = %call.tool_name, call_id = %call.call_id, error = %message, "tool_execution_failed");
                outputs.push(FunctionCallOutput {
                    id: new_id(),
                    call_id: call.call_id.clone(),
                    name: call.tool_name.clone(),
                    output: format!("error: {message}"),
                    is_error: true,
                });
                continue;
            }
        };
        match outcome {
            ToolOutcome::Value(value) => outputs.push(FunctionCallOutput {
                id: new_id(),
                call_id: call.call_id.clone(),
                name: call.tool_name.clone(),
                output: value,
                is_error: false,
            }),
            ToolOutcome::Handoff(record) => {
                if handoff.is_none() {
                    let output = record.returns.clone().unwrap_or_default();
                    handoff = Some(record);
                    outputs.push(FunctionCallOutput {
                        id: new_id(),
                        call_id: call.call_id.clone(),
                        name: call.tool_name.clone(),
                        output,
                        is_error: false,
                    });
                } else {
                    tracing::warn!(
                        call_id = %call.call_id,
                        "dropping extra handoff, only the first per batch is honored"
                    );
                    outputs.push(FunctionCallOutput {
                        id: new_id(),
                        call_id: call.call_id.clone(),
                        name: call.tool_name.clone(),
                        output: "error: a handoff was already requested in this batch".into(),
                        is_error: true,
                    });
                }
            }
        }
    }

    ToolBatchResult { outputs, handoff }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use va_domain::tool::FunctionTool;
    use va_domain::Result;

    struct Echo;
    #[async_trait]
    impl va_domain::tool::ToolExecutor for Echo {
        async fn execute(&self, _ctx: RunContext, call: &ToolCallArgs) -> Result<ToolOutcome> {
            Ok(ToolOutcome::Value(format!("echo:{}", call.arguments)))
        }
    }

    struct AlwaysHandsOff;
    #[async_trait]
    impl va_domain::tool::ToolExecutor for AlwaysHandsOff {
        async fn execute(&self, _ctx: RunContext, _call: &ToolCallArgs) -> Result<ToolOutcome> {
            Ok(ToolOutcome::Handoff(HandoffRecord {
                agent_id: "next".into(),
                returns: Some("transferring you now".into()),
            }))
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new()
            .with_tool(FunctionTool {
                name: "echo".into(),
                description: "".into(),
                parameters: serde_json::json!({}),
                executor: Arc::new(Echo),
            })
            .with_tool(FunctionTool {
                name: "transfer".into(),
                description: "".into(),
                parameters: serde_json::json!({}),
                executor: Arc::new(AlwaysHandsOff),
            })
    }

    fn call(id: &str, tool: &str) -> ToolCallArgs {
        ToolCallArgs {
            call_id: id.into(),
            tool_name: tool.into(),
            arguments: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn unknown_tool_synthesizes_error_output() {
        let result = execute_tool_batch(&ctx(), &[call("c1", "missing")], CancellationToken::new(), None).await;
        assert_eq!(result.outputs.len(), 1);
        assert!(result.outputs[0].is_error);
        assert!(result.handoff.is_none());
    }

    #[tokio::test]
    async fn calls_and_outputs_stay_symmetric() {
        let calls = vec![call("c1", "echo"), call("c2", "missing"), call("c3", "echo")];
        let result = execute_tool_batch(&ctx(), &calls, CancellationToken::new(), None).await;
        assert_eq!(result.outputs.len(), calls.len());
        assert_eq!(result.outputs[0].output, "echo:{}");
    }

    #[tokio::test]
    async fn only_first_handoff_in_a_batch_is_honored() {
        let calls = vec![call("c1", "transfer"), call("c2", "transfer")];
        let result = execute_tool_batch(&ctx(), &calls, CancellationToken::new(), None).await;
        assert_eq!(result.handoff.unwrap().agent_id, "next");
        assert!(!result.outputs[0].is_error);
        assert!(result.outputs[1].is_error);
    }
}
