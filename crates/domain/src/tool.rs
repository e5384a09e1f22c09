//! Tool contracts: the immutable-per-turn mapping from tool name to
//! executor that the LLM may invoke during a turn.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A tool call as materialized from the LLM's streamed deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallArgs {
    pub call_id: String,
    pub tool_name: String,
    /// Raw JSON arguments as emitted by the model.
    pub arguments: serde_json::Value,
}

/// What a tool execution produced.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// A plain value, stringified into the `function_call_output`.
    Value(String),
    /// The tool requested an agent handoff. At most one handoff per batch
    /// is honored; see `ToolContext::reconcile_handoffs`.
    Handoff(HandoffRecord),
}

#[derive(Debug, Clone)]
pub struct HandoffRecord {
    /// Opaque identifier of the next agent (resolved by the session layer).
    pub agent_id: String,
    /// Value returned to the LLM as the tool's output, if any.
    pub returns: Option<String>,
}

/// Context handed to a tool executor for one invocation.
#[derive(Clone)]
pub struct RunContext {
    pub tool_call_id: String,
    /// Cancelled on interruption or session close.
    pub abort_signal: CancellationToken,
    /// Opaque session user-data, passed through untouched.
    pub user_data: Option<Arc<serde_json::Value>>,
}

#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, ctx: RunContext, call: &ToolCallArgs) -> Result<ToolOutcome>;
}

pub struct FunctionTool {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's parameters.
    pub parameters: serde_json::Value,
    pub executor: Arc<dyn ToolExecutor>,
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// An immutable (for the duration of a turn) set of callable tools.
#[derive(Default)]
pub struct ToolContext {
    tools: HashMap<String, Arc<FunctionTool>>,
}

impl ToolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, tool: FunctionTool) -> Self {
        self.tools.insert(tool.name.clone(), Arc::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<FunctionTool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
