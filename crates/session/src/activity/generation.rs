//! One LLM turn (§4.7.3): stream a completion, materialize any tool calls,
//! run the tool batch, and report whether a follow-up speech should be
//! scheduled. The scheduler in `mod.rs` owns when this runs and what
//! happens to its result; this module only knows how to run it once.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use va_domain::chat::{ChatContext, MessageContent, Role};
use va_domain::tool::{HandoffRecord, ToolCallArgs, ToolContext};
use va_domain::Result;
use va_providers::llm::{ChatRequest, ConnectOptions, LlmProvider, ToolChoice};

use super::tools::execute_tool_batch;

pub struct GenerationOutcome {
    /// Chat context extended with the assistant message, any `function_call`
    /// items, and (once the batch resolves) their `function_call_output`s.
    pub chat_ctx: ChatContext,
    /// Text to speak, empty if the turn was tool-calls-only.
    pub assistant_text: String,
    pub handoff: Option<HandoffRecord>,
    /// `Some(next_depth)` when a follow-up speech should be generated.
    pub follow_up_depth: Option<u32>,
}

#[derive(Default)]
struct PendingCall {
    name: String,
    args: String,
}

/// Runs one LLM completion over `chat_ctx`, executes any tool calls it
/// requests, and decides whether the chain continues. `depth` is the
/// depth of the speech being generated; follow-ups stop once
/// `depth + 1 > max_tool_steps`.
pub async fn run_generation_step(
    llm: &dyn LlmProvider,
    tool_ctx: &Arc<ToolContext>,
    mut chat_ctx: ChatContext,
    depth: u32,
    max_tool_steps: u32,
    conn_options: ConnectOptions,
    abort_signal: CancellationToken,
) -> Result<GenerationOutcome> {
    let req = ChatRequest {
        chat_ctx: Arc::new(chat_ctx.clone()),
        tool_ctx: if tool_ctx.is_empty() { None } else { Some(Arc::clone(tool_ctx)) },
        tool_choice: ToolChoice::Auto,
        conn_options,
        extra: serde_json::Value::Null,
    };
    let mut stream = llm
        .chat(req)
        .await
        .map_err(|e| va_domain::Error::Other(e.to_string()))?;

    let mut text = String::new();
    let mut pending: HashMap<String, PendingCall> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = abort_signal.cancelled() => break,
            chunk = stream.next() => {
                let Some(chunk) = chunk else { break };
                let chunk = chunk.map_err(|e| va_domain::Error::Other(e.to_string()))?;
                if let Some(content) = chunk.delta.content {
                    text.push_str(&content);
                }
                for delta in chunk.delta.tool_calls {
                    let entry = pending.entry(delta.call_id.clone()).or_insert_with(|| {
                        order.push(delta.call_id.clone());
                        PendingCall::default()
                    });
                    if !delta.name.is_empty() {
                        entry.name = delta.name;
                    }
                    entry.args.push_str(&delta.args);
                }
            }
        }
    }

    if !text.is_empty() {
        chat_ctx.append_message(Role::Assistant, MessageContent::Text(text.clone()));
    }

    let mut calls = Vec::with_capacity(order.len());
    for call_id in &order {
        let pending = pending.remove(call_id).unwrap_or_default();
        chat_ctx.append_function_call(call_id.clone(), pending.name.clone(), pending.args.clone());
        calls.push(ToolCallArgs {
            call_id: call_id.clone(),
            tool_name: pending.name,
            arguments: serde_json::from_str(&pending.args).unwrap_or(serde_json::Value::Null),
        });
    }

    if calls.is_empty() {
        return Ok(GenerationOutcome {
            chat_ctx,
            assistant_text: text,
            handoff: None,
            follow_up_depth: None,
        });
    }

    let batch = execute_tool_batch(tool_ctx.as_ref(), &calls, abort_signal, None).await;
    for output in &batch.outputs {
        chat_ctx.append_function_call_output(
            output.call_id.clone(),
            output.name.clone(),
            output.output.clone(),
            output.is_error,
        )?;
    }

    let next_depth = depth + 1;
    let follow_up_depth = if batch.handoff.is_some() || next_depth > max_tool_steps {
        None
    } else {
        Some(next_depth)
    };

    Ok(GenerationOutcome {
        chat_ctx,
        assistant_text: text,
        handoff: batch.handoff,
        follow_up_depth,
    })
}
