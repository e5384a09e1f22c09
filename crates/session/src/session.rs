//! `AgentSession` (§4.8): owns the active (and, during a handoff, the next)
//! `AgentActivity`, exposes the session's public verbs, and runs the
//! close sequence and user-away timer.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use va_domain::chat::{ChatContext, MessageContent, Role};
use va_domain::config::SessionOptions;
use va_domain::speech::SpeechHandle;
use va_domain::Result;
use va_streams::{AudioFrame, Writable};
use va_util::task::Task;

use crate::activity::AgentActivity;
use crate::agent::Agent;
use crate::events::{new_event_bus, SessionEvent, SessionEventReceiver, SessionEventSender, UserState};

/// Forwards `commitUserTurn`/`clearUserTurn` to whatever drives audio
/// recognition (§4.8) — owned outside this crate, since `va-session` has
/// no audio-capture code of its own.
#[async_trait]
pub trait TurnControl: Send + Sync {
    async fn commit_user_turn(&self);
    async fn clear_user_turn(&self);
}

pub struct NoopTurnControl;
#[async_trait]
impl TurnControl for NoopTurnControl {
    async fn commit_user_turn(&self) {}
    async fn clear_user_turn(&self) {}
}

pub struct AgentSession {
    options: SessionOptions,
    events_tx: SessionEventSender,
    audio_sink: Option<Arc<Writable<AudioFrame>>>,
    turn_control: Arc<dyn TurnControl>,

    current_activity: Mutex<Arc<AgentActivity>>,
    next_activity: Mutex<Option<Arc<AgentActivity>>>,

    closed: AtomicBool,
    last_stt_activity_ms: AtomicI64,
    away_timer: Mutex<Option<Task<()>>>,
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl AgentSession {
    pub async fn new(
        agent: Arc<Agent>,
        options: SessionOptions,
        audio_sink: Option<Arc<Writable<AudioFrame>>>,
        turn_control: Option<Arc<dyn TurnControl>>,
    ) -> Arc<Self> {
        let (events_tx, _rx) = new_event_bus();
        let activity = AgentActivity::new(agent, options.clone(), events_tx.clone(), audio_sink.clone());
        activity.start().await;
        let session = Arc::new(Self {
            options,
            events_tx,
            audio_sink,
            turn_control: turn_control.unwrap_or_else(|| Arc::new(NoopTurnControl)),
            current_activity: Mutex::new(activity),
            next_activity: Mutex::new(None),
            closed: AtomicBool::new(false),
            last_stt_activity_ms: AtomicI64::new(now_ms()),
            away_timer: Mutex::new(None),
        });
        session.clone().spawn_away_timer().await;
        session
    }

    pub fn subscribe(&self) -> SessionEventReceiver {
        self.events_tx.subscribe()
    }

    async fn active(&self) -> Arc<AgentActivity> {
        if let Some(next) = self.next_activity.lock().await.as_ref() {
            return next.clone();
        }
        self.current_activity.lock().await.clone()
    }

    /// `say(text, {audio?})` (§4.8). Routes to the activity currently
    /// accepting new speech — `nextActivity` during a handoff, the current
    /// one otherwise.
    pub async fn say(&self, text: impl Into<String>, priority: i32) -> Result<Arc<SpeechHandle>> {
        let text = text.into();
        let activity = self.active().await;
        let mut chat_ctx = ChatContext::new();
        chat_ctx.append_message(Role::Assistant, MessageContent::Text(text.clone()));
        activity.say(chat_ctx, text, priority, false).await
    }

    /// `generateReply({userInput?, ...})` (§4.8). `user_input` becomes a
    /// synthetic user turn; `None` generates from the existing context
    /// unchanged (a system-only prompt).
    pub async fn generate_reply(&self, user_input: Option<String>, priority: i32) -> Result<Arc<SpeechHandle>> {
        let activity = self.active().await;
        let mut chat_ctx = ChatContext::new();
        if let Some(text) = user_input {
            chat_ctx.append_message(Role::User, MessageContent::Text(text));
        }
        activity.generate_reply(chat_ctx, priority, false).await
    }

    /// `interrupt({force?})` (§4.8).
    pub async fn interrupt(&self, force: bool) {
        self.active().await.interrupt_all(force).await;
    }

    pub async fn commit_user_turn(&self) {
        self.turn_control.commit_user_turn().await;
        self.note_stt_activity();
    }

    pub async fn clear_user_turn(&self) {
        self.turn_control.clear_user_turn().await;
    }

    /// Marks STT activity, resetting the user-away timer. Called by the
    /// runtime on every recognized utterance, not just committed turns.
    pub fn note_stt_activity(&self) {
        self.last_stt_activity_ms.store(now_ms(), Ordering::SeqCst);
    }

    /// `session.updateAgent(next)` (§4.7.4): pauses the current activity,
    /// runs exit/enter hooks, then atomically swaps.
    pub async fn update_agent(&self, next: Arc<Agent>) {
        let current = self.current_activity.lock().await.clone();
        current.pause_scheduling();
        current.agent.hooks.on_exit(&current).await;

        let next_activity = AgentActivity::new(next, self.options.clone(), self.events_tx.clone(), self.audio_sink.clone());
        *self.next_activity.lock().await = Some(next_activity.clone());
        next_activity.agent.hooks.on_enter(&next_activity).await;
        next_activity.start().await;

        let _ = self.events_tx.send(SessionEvent::AgentStateChanged {
            agent_id: next_activity.agent.id.clone(),
        });

        *self.current_activity.lock().await = next_activity;
        *self.next_activity.lock().await = None;
        let current = self.current_activity.lock().await.clone();
        current.resume_scheduling();
    }

    /// Close sequence (§4.8): force-interrupt, commit the user turn unless
    /// this is an error close, await playout, drain, close, detach audio,
    /// emit `Close` exactly once.
    pub async fn close(&self, reason: impl Into<String>, error: Option<String>) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let reason = reason.into();
        let activity = self.active().await;

        activity.interrupt_all(true).await;
        if error.is_none() {
            self.turn_control.commit_user_turn().await;
        }
        activity.drain().await;
        activity.close().await;

        if let Some(timer) = self.away_timer.lock().await.take() {
            timer.cancel();
        }

        let _ = self.events_tx.send(SessionEvent::Close { reason, error });
    }

    /// User-away detection (§4.8): a timer driven by last STT activity.
    /// Firing only emits `UserStateChanged` — the session never auto-closes.
    async fn spawn_away_timer(self: Arc<Self>) {
        let session = self.clone();
        let timeout_sec = self.options.user_away_timeout_sec;
        let task = Task::spawn(move |ctx| async move {
            let mut user_state = UserState::Listening;
            loop {
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Ok::<_, String>(()),
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
                if session.closed.load(Ordering::SeqCst) {
                    return Ok(());
                }
                let idle_ms = now_ms() - session.last_stt_activity_ms.load(Ordering::SeqCst);
                let is_away = idle_ms >= (timeout_sec as i64) * 1000;
                let new_state = if is_away { UserState::Away } else { UserState::Listening };
                if new_state != user_state {
                    user_state = new_state.clone();
                    let _ = session.events_tx.send(SessionEvent::UserStateChanged { new_state });
                }
            }
        });
        *self.away_timer.lock().await = Some(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_domain::tool::ToolContext;

    fn agent() -> Arc<Agent> {
        Arc::new(Agent::new("a1", "be helpful").with_tool_ctx(Arc::new(ToolContext::new())))
    }

    #[tokio::test]
    async fn say_without_llm_schedules_and_completes() {
        let session = AgentSession::new(agent(), SessionOptions::default(), None, None).await;
        let handle = session.say("hello there", 0).await.unwrap();
        for _ in 0..50 {
            if handle.is_done() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_done());
    }

    #[tokio::test]
    async fn close_emits_exactly_once() {
        let session = AgentSession::new(agent(), SessionOptions::default(), None, None).await;
        let mut rx = session.subscribe();
        session.close("done", None).await;
        session.close("done again", None).await;
        let mut closes = 0;
        while let Ok(evt) = rx.try_recv() {
            if matches!(evt, SessionEvent::Close { .. }) {
                closes += 1;
            }
        }
        assert_eq!(closes, 1);
    }
}
