//! `AgentActivity` (§4.7): the per-agent state machine that multiplexes the
//! speech queue, the LLM/tool-call loop, and TTS playout. One activity
//! serves exactly one [`crate::agent::Agent`] for as long as that agent is
//! bound to the session; a handoff swaps in a fresh activity (§4.7.4).

pub mod generation;
pub mod interruption;
pub mod scheduler;
pub mod tools;

use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use va_domain::chat::ChatContext;
use va_domain::config::{InterruptionConfig, SessionOptions};
use va_domain::speech::SpeechHandle;
use va_domain::tool::HandoffRecord;
use va_providers::llm::ConnectOptions;
use va_streams::{AudioFrame, Writable};
use va_util::future::Future as VaFuture;
use va_util::shortuuid;
use va_util::task::{Task, TaskContext};

use crate::agent::Agent;
use crate::events::{SessionEvent, SessionEventSender};
use interruption::{AdaptiveClassifier, ClassifierVerdict};
use scheduler::QueuedSpeech;

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub struct AgentActivity {
    pub agent: Arc<Agent>,
    options: SessionOptions,
    events: SessionEventSender,
    audio_sink: Option<Arc<Writable<AudioFrame>>>,

    queue: Mutex<BinaryHeap<QueuedSpeech>>,
    next_seq: AtomicU64,
    current_speech: Mutex<Option<Arc<SpeechHandle>>>,
    /// Re-created every time the main loop consumes a pop; `scheduleSpeech`
    /// resolves whichever instance is current so the loop wakes exactly
    /// once per signal (§4.7.1).
    q_updated: Mutex<Arc<VaFuture<()>>>,
    scheduling_paused: AtomicBool,
    pending_handoff: Mutex<Option<HandoffRecord>>,
    main_task: Mutex<Option<Task<()>>>,
    /// Text for a `say()`-created speech, keyed by speech id — present only
    /// for the duration between scheduling and the scheduler picking it up,
    /// so `run_speech` can skip the LLM call for canned utterances.
    say_texts: Mutex<HashMap<String, String>>,
    /// Optional adaptive overlap classifier (§4.7.2); unset means the
    /// plain word/duration gate in `interruption::should_interrupt` is the
    /// whole story.
    adaptive_classifier: Mutex<Option<Arc<dyn AdaptiveClassifier>>>,
}

impl AgentActivity {
    pub fn new(
        agent: Arc<Agent>,
        options: SessionOptions,
        events: SessionEventSender,
        audio_sink: Option<Arc<Writable<AudioFrame>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            agent,
            options,
            events,
            audio_sink,
            queue: Mutex::new(BinaryHeap::new()),
            next_seq: AtomicU64::new(0),
            current_speech: Mutex::new(None),
            q_updated: Mutex::new(Arc::new(VaFuture::new())),
            scheduling_paused: AtomicBool::new(false),
            pending_handoff: Mutex::new(None),
            main_task: Mutex::new(None),
            say_texts: Mutex::new(HashMap::new()),
            adaptive_classifier: Mutex::new(None),
        })
    }

    /// Opts into adaptive interruption mode (§4.7.2) by supplying the
    /// overlap classifier. No-op if `adaptive_enabled` is false in
    /// `SessionOptions` — callers still go through
    /// `on_adaptive_interruption_signal` to exercise it.
    pub async fn set_adaptive_classifier(&self, classifier: Arc<dyn AdaptiveClassifier>) {
        *self.adaptive_classifier.lock().await = Some(classifier);
    }

    /// Schedules a fixed utterance with no LLM call — `AgentSession::say`
    /// (§4.8). `chat_ctx` is the snapshot the utterance is recorded against
    /// once played (so later generations see it as an assistant turn).
    pub async fn say(
        &self,
        chat_ctx: ChatContext,
        text: impl Into<String>,
        priority: i32,
        force: bool,
    ) -> va_domain::Result<Arc<SpeechHandle>> {
        let text = text.into();
        let handle = Arc::new(SpeechHandle::new(shortuuid(), priority, true, 0, chat_ctx, None));
        self.say_texts.lock().await.insert(handle.id.clone(), text);
        self.schedule_speech(handle.clone(), priority, force).await?;
        Ok(handle)
    }

    /// Schedules a speech that runs the normal LLM/tool-call loop over
    /// `chat_ctx` — `AgentSession::generate_reply` (§4.8).
    pub async fn generate_reply(&self, chat_ctx: ChatContext, priority: i32, force: bool) -> va_domain::Result<Arc<SpeechHandle>> {
        let handle = Arc::new(SpeechHandle::new(shortuuid(), priority, true, 0, chat_ctx, None));
        self.schedule_speech(handle.clone(), priority, force).await?;
        Ok(handle)
    }

    /// Spawns the main scheduling loop. Idempotent only in the sense that a
    /// second call replaces the stored handle — callers start an activity
    /// exactly once.
    pub async fn start(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let task = Task::spawn(move |ctx| async move { this.run_loop(ctx).await });
        *self.main_task.lock().await = Some(task);
    }

    async fn run_loop(self: Arc<Self>, ctx: TaskContext) -> Result<(), String> {
        loop {
            if ctx.is_cancelled() {
                return Ok(());
            }
            loop {
                let should_wait = {
                    let q = self.queue.lock().await;
                    let cur = self.current_speech.lock().await;
                    q.is_empty() || !cur.as_ref().map(|h| h.is_done()).unwrap_or(true)
                };
                if !should_wait {
                    break;
                }
                let waiter = self.q_updated.lock().await.clone();
                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return Ok(()),
                    _ = waiter.wait() => {}
                }
            }

            let popped = self.queue.lock().await.pop();
            let Some(queued) = popped else { continue };
            // A fresh signal for whatever gets scheduled while this speech runs.
            *self.q_updated.lock().await = Arc::new(VaFuture::new());

            if queued.handle.is_interrupted() {
                continue;
            }
            *self.current_speech.lock().await = Some(queued.handle.clone());
            self.run_speech(queued.handle.clone()).await;
            *self.current_speech.lock().await = None;
        }
    }

    /// `scheduleSpeech` (§4.7.1). Raises unless `force` when scheduling is
    /// paused (draining, or mid-handoff).
    pub async fn schedule_speech(&self, handle: Arc<SpeechHandle>, priority: i32, force: bool) -> va_domain::Result<()> {
        if self.scheduling_paused.load(Ordering::SeqCst) && !force {
            return Err(va_domain::Error::Other("scheduling is paused".into()));
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        handle.mark_scheduled();
        let _ = self.events.send(SessionEvent::SpeechCreated {
            speech_id: handle.id.clone(),
            priority,
            depth: handle.depth,
        });
        self.queue.lock().await.push(QueuedSpeech { seq, priority, handle: handle.clone() });
        self.q_updated.lock().await.resolve(());
        Ok(())
    }

    pub fn pause_scheduling(&self) {
        self.scheduling_paused.store(true, Ordering::SeqCst);
    }

    pub fn resume_scheduling(&self) {
        self.scheduling_paused.store(false, Ordering::SeqCst);
    }

    pub fn is_scheduling_paused(&self) -> bool {
        self.scheduling_paused.load(Ordering::SeqCst)
    }

    async fn current(&self) -> Option<Arc<SpeechHandle>> {
        self.current_speech.lock().await.clone()
    }

    /// Applies the gating in §4.7.2 to an inbound interruption signal
    /// (VAD start-of-speech or a non-trivial STT final transcript).
    pub async fn on_interruption_signal(&self, text: &str) {
        let Some(cur) = self.current().await else { return };
        let cfg = InterruptionConfig::from(&self.options);
        if interruption::should_interrupt(&cfg, &cur, text, now_ms()) == interruption::InterruptionDecision::Interrupt {
            cur.interrupt();
        }
    }

    /// Adaptive variant of [`Self::on_interruption_signal`] (§4.7.2): when
    /// an adaptive classifier is installed and enabled, the buffered
    /// `audio_prefix` overlap decides interrupt-vs-backchannel instead of
    /// the plain word/duration gate. On backchannel the speech plays on
    /// and an `OverlapDetected` event is emitted; falls back to the plain
    /// gate if no classifier is installed.
    pub async fn on_adaptive_interruption_signal(&self, text: &str, audio_prefix: &[AudioFrame]) {
        let Some(cur) = self.current().await else { return };
        let cfg = InterruptionConfig::from(&self.options);
        if !cur.allow_interruptions {
            return;
        }
        let classifier = self.adaptive_classifier.lock().await.clone();
        let (Some(classifier), true) = (classifier, cfg.adaptive_enabled) else {
            return self.on_interruption_signal(text).await;
        };
        match classifier.classify(audio_prefix).await {
            ClassifierVerdict::Interrupt => cur.interrupt(),
            ClassifierVerdict::Backchannel => {
                let _ = self.events.send(SessionEvent::OverlapDetected { speech_id: cur.id.clone() });
            }
        }
    }

    /// Unconditional interrupt of whatever is currently playing, used by
    /// `AgentSession::interrupt` and the close sequence. `force` bypasses
    /// `allow_interruptions`.
    pub async fn interrupt_current(&self, force: bool) {
        if let Some(cur) = self.current().await {
            if force || cur.allow_interruptions {
                cur.interrupt();
            }
        }
    }

    pub async fn take_pending_handoff(&self) -> Option<HandoffRecord> {
        self.pending_handoff.lock().await.take()
    }

    /// `AgentSession::interrupt` (§4.8): stops the current playout and
    /// discards whatever is still queued, then waits for the stop to take
    /// effect.
    pub async fn interrupt_all(&self, force: bool) {
        self.interrupt_current(force).await;
        {
            let q = self.queue.lock().await;
            for queued in q.iter() {
                queued.handle.interrupt();
            }
        }
        while self.current().await.is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn run_speech(&self, handle: Arc<SpeechHandle>) {
        handle.mark_started(now_ms());
        let cancel = handle.cancellation();

        if let Some(text) = self.say_texts.lock().await.remove(&handle.id) {
            handle.mark_generation_done();
            if !handle.is_interrupted() {
                self.synthesize_and_play(&text, &cancel).await;
            }
            handle.mark_playout_done();
            return;
        }

        let outcome = if let Some(llm) = &self.agent.llm {
            generation::run_generation_step(
                llm.as_ref(),
                &self.agent.tool_ctx,
                handle.chat_ctx.copy(),
                handle.depth,
                self.options.max_tool_steps,
                ConnectOptions::default(),
                cancel.clone(),
            )
            .await
        } else {
            Ok(generation::GenerationOutcome {
                chat_ctx: handle.chat_ctx.copy(),
                assistant_text: String::new(),
                handoff: None,
                follow_up_depth: None,
            })
        };
        handle.mark_generation_done();

        match outcome {
            Ok(result) => {
                if let Some(handoff) = result.handoff {
                    *self.pending_handoff.lock().await = Some(handoff);
                }
                if !handle.is_interrupted() {
                    self.synthesize_and_play(&result.assistant_text, &cancel).await;
                }
                if let Some(next_depth) = result.follow_up_depth {
                    if !handle.is_interrupted() {
                        self.schedule_follow_up(&handle, result.chat_ctx, next_depth).await;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(speech_id = %handle.id, error = %err, "speech_generation_failed");
            }
        }
        handle.mark_playout_done();
    }

    async fn schedule_follow_up(&self, parent: &Arc<SpeechHandle>, chat_ctx: ChatContext, depth: u32) {
        let child = Arc::new(SpeechHandle::new(
            shortuuid(),
            parent.priority,
            parent.allow_interruptions,
            depth,
            chat_ctx,
            Some(parent.clone()),
        ));
        if let Err(err) = self.schedule_speech(child, parent.priority, true).await {
            tracing::warn!(error = %err, "follow_up_schedule_failed");
        }
    }

    async fn synthesize_and_play(&self, text: &str, cancel: &CancellationToken) {
        if text.is_empty() {
            return;
        }
        let Some(tts) = &self.agent.tts else { return };
        let Some(sink) = &self.audio_sink else { return };
        let mut stream = match tts.synthesize(text).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!(error = %err, "tts_synthesize_failed");
                return;
            }
        };
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                chunk = stream.next() => match chunk {
                    Some(Ok(audio)) => {
                        if sink.write(audio.frame).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "tts_chunk_failed");
                        break;
                    }
                    None => break,
                },
            }
        }
    }

    /// `drain` (§4.7.6): stop accepting new speech and wait for the queue
    /// and any in-flight speech to finish.
    pub async fn drain(&self) {
        self.pause_scheduling();
        loop {
            let quiescent = {
                let q = self.queue.lock().await;
                let cur = self.current_speech.lock().await;
                q.is_empty() && cur.is_none()
            };
            if quiescent {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// `close` (§4.7.6): cancel the main loop and release provider streams.
    /// Callers are expected to have already interrupted and drained.
    pub async fn close(&self) {
        if let Some(task) = self.main_task.lock().await.take() {
            let _ = task.cancel_and_wait().await;
        }
        if let Some(sink) = &self.audio_sink {
            sink.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use va_domain::tool::ToolContext;

    struct FixedVerdict(ClassifierVerdict);

    #[async_trait]
    impl AdaptiveClassifier for FixedVerdict {
        async fn classify(&self, _prefix: &[AudioFrame]) -> ClassifierVerdict {
            self.0
        }
    }

    fn options_with_adaptive() -> SessionOptions {
        SessionOptions {
            adaptive_interruption_enabled: true,
            ..SessionOptions::default()
        }
    }

    fn agent() -> Arc<Agent> {
        Arc::new(Agent::new("a1", "be helpful").with_tool_ctx(Arc::new(ToolContext::new())))
    }

    async fn activity_with_current_speech(options: SessionOptions) -> (Arc<AgentActivity>, Arc<SpeechHandle>) {
        let (events, _rx) = crate::events::new_event_bus();
        let activity = AgentActivity::new(agent(), options, events, None);
        let handle = Arc::new(SpeechHandle::new(
            shortuuid(),
            0,
            true,
            0,
            ChatContext::new(),
            None,
        ));
        handle.mark_started(now_ms() - 10_000);
        *activity.current_speech.lock().await = Some(handle.clone());
        (activity, handle)
    }

    #[tokio::test]
    async fn adaptive_backchannel_does_not_interrupt_and_emits_overlap() {
        let (activity, speech) = activity_with_current_speech(options_with_adaptive()).await;
        let mut rx = activity.events.subscribe();
        activity.set_adaptive_classifier(Arc::new(FixedVerdict(ClassifierVerdict::Backchannel))).await;

        activity.on_adaptive_interruption_signal("mhm", &[]).await;

        assert!(!speech.is_interrupted());
        let evt = rx.recv().await.unwrap();
        assert!(matches!(evt, SessionEvent::OverlapDetected { speech_id } if speech_id == speech.id));
    }

    #[tokio::test]
    async fn adaptive_interrupt_verdict_interrupts_current_speech() {
        let (activity, speech) = activity_with_current_speech(options_with_adaptive()).await;
        activity.set_adaptive_classifier(Arc::new(FixedVerdict(ClassifierVerdict::Interrupt))).await;

        activity.on_adaptive_interruption_signal("stop now please", &[]).await;

        assert!(speech.is_interrupted());
    }

    #[tokio::test]
    async fn without_classifier_falls_back_to_plain_gate() {
        let (activity, speech) = activity_with_current_speech(options_with_adaptive()).await;

        activity.on_adaptive_interruption_signal("uh", &[]).await;
        assert!(!speech.is_interrupted());

        activity.on_adaptive_interruption_signal("please stop that now", &[]).await;
        assert!(speech.is_interrupted());
    }
}
