//! `Agent`/`AgentActivity`/`AgentSession` (§4.7, §4.8): the per-turn state
//! machine every voice agent runs on top of — speech scheduling,
//! interruption gating, the tool-call loop, handoff, and the session's
//! public verbs.

pub mod activity;
pub mod agent;
pub mod events;
pub mod session;

pub use activity::AgentActivity;
pub use agent::{Agent, AgentHooks, NoopHooks};
pub use events::{SessionEvent, SessionEventReceiver, SessionEventSender, UserState};
pub use session::{AgentSession, NoopTurnControl, TurnControl};
