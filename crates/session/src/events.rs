//! Session events (§REDESIGN FLAGS: event emitters become typed pub/sub).
//! Every named event a session or activity raises is one variant here,
//! published on a single `broadcast` channel so subscribers attach and
//! detach independent of any one component's lifetime.

use va_domain::metrics::MetricRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserState {
    Listening,
    Away,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new speech handle was created and scheduled.
    SpeechCreated { speech_id: String, priority: i32, depth: u32 },
    /// A provider flipped availability (§4.5's `availability_changed`).
    AvailabilityChanged { provider_id: String, available: bool },
    /// Adaptive-interruption overlap classifier decided "backchannel" —
    /// the current speech was not interrupted (§4.7.2).
    OverlapDetected { speech_id: String },
    UserStateChanged { new_state: UserState },
    AgentStateChanged { agent_id: String },
    /// One metric record republished from a provider's own channel so a
    /// session-level subscriber doesn't need per-provider wiring.
    MetricsCollected(MetricRecord),
    /// Terminal: emitted exactly once per session, successful or not.
    Close { reason: String, error: Option<String> },
}

pub type SessionEventSender = tokio::sync::broadcast::Sender<SessionEvent>;
pub type SessionEventReceiver = tokio::sync::broadcast::Receiver<SessionEvent>;

pub const DEFAULT_EVENT_CAPACITY: usize = 256;

pub fn new_event_bus() -> (SessionEventSender, SessionEventReceiver) {
    tokio::sync::broadcast::channel(DEFAULT_EVENT_CAPACITY)
}
