//! Core data model for the voice agent runtime: chat context, tool
//! contracts, job identity, provider capability flags, session
//! configuration, and metric record shapes. No runtime behavior lives
//! here — just the value types every other crate builds on.

pub mod capability;
pub mod chat;
pub mod config;
pub mod error;
pub mod ids;
pub mod job;
pub mod metrics;
pub mod speech;
pub mod stream;
pub mod tool;

pub use chat::{ChatContext, ChatItem, ChatMessage, ContentPart, FunctionCall, FunctionCallOutput, MessageContent, Role};
pub use error::{Error, Result};
pub use job::{Job, JobState, RunningJobInfo};
pub use speech::SpeechHandle;
pub use tool::{FunctionTool, HandoffRecord, RunContext, ToolCallArgs, ToolContext, ToolExecutor, ToolOutcome};
