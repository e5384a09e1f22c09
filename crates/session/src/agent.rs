//! `Agent` (§3 GLOSSARY: "the user-defined role — instructions + tools —
//! driving a session"). Binds instructions, a tool context, and the
//! provider set one `AgentActivity` will drive; `on_enter`/`on_exit` hooks
//! run during a handoff (§4.7.4).

use std::sync::Arc;

use async_trait::async_trait;

use va_domain::tool::ToolContext;
use va_providers::llm::LlmProvider;
use va_providers::stt::SttProvider;
use va_providers::tts::TtsProvider;
use va_turn::eou::EouThresholds;

use crate::activity::AgentActivity;

/// Hooks run around a handoff. The default is a no-op pair — most agents
/// don't need entry/exit side effects.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    async fn on_enter(&self, _activity: &AgentActivity) {}
    async fn on_exit(&self, _activity: &AgentActivity) {}
}

pub struct NoopHooks;

#[async_trait]
impl AgentHooks for NoopHooks {}

pub struct Agent {
    pub id: String,
    pub instructions: String,
    pub tool_ctx: Arc<ToolContext>,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub stt: Option<Arc<dyn SttProvider>>,
    pub tts: Option<Arc<dyn TtsProvider>>,
    pub eou_thresholds: EouThresholds,
    pub hooks: Arc<dyn AgentHooks>,
}

impl Agent {
    pub fn new(id: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            instructions: instructions.into(),
            tool_ctx: Arc::new(ToolContext::new()),
            llm: None,
            stt: None,
            tts: None,
            eou_thresholds: EouThresholds::default(),
            hooks: Arc::new(NoopHooks),
        }
    }

    pub fn with_tool_ctx(mut self, tool_ctx: Arc<ToolContext>) -> Self {
        self.tool_ctx = tool_ctx;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_stt(mut self, stt: Arc<dyn SttProvider>) -> Self {
        self.stt = Some(stt);
        self
    }

    pub fn with_tts(mut self, tts: Arc<dyn TtsProvider>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AgentHooks>) -> Self {
        self.hooks = hooks;
        self
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent").field("id", &self.id).finish()
    }
}
