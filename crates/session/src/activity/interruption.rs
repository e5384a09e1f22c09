//! Interruption gating (§4.7.2): the same decision applies uniformly to a
//! VAD start-of-speech signal and an STT final transcript, so both call
//! sites in `mod.rs` funnel through [`should_interrupt`].

use async_trait::async_trait;

use va_domain::config::InterruptionConfig;
use va_domain::SpeechHandle;
use va_streams::AudioFrame;

/// Adaptive-mode overlap classifier (§4.7.2, §9 open question): given the
/// buffered audio prefix leading up to an interruption signal, decides
/// whether the overlap is a real interruption or a backchannel ("mhm",
/// "yeah") that should let the current speech continue. Only the
/// interface is mandated by the spec — no concrete model ships here, the
/// same class of external collaborator as the EOU/turn-detector models.
#[async_trait]
pub trait AdaptiveClassifier: Send + Sync {
    async fn classify(&self, prefix: &[AudioFrame]) -> ClassifierVerdict;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierVerdict {
    Interrupt,
    Backchannel,
}

/// Split on whitespace, keeping punctuation attached to the word it
/// follows — matches the spec's `splitWords(text, withPunctuation=true)`.
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionDecision {
    Interrupt,
    Ignore,
}

/// `now_ms` and `current.started_at_ms()` are both millis-since-epoch;
/// duration-played is undefined (treated as zero) until the speech starts.
pub fn should_interrupt(
    cfg: &InterruptionConfig,
    current: &SpeechHandle,
    text: &str,
    now_ms: i64,
) -> InterruptionDecision {
    if !current.allow_interruptions {
        return InterruptionDecision::Ignore;
    }
    let word_count = split_words(text).len() as u32;
    if word_count < cfg.min_interruption_words {
        return InterruptionDecision::Ignore;
    }
    let played_ms = current.started_at_ms().map(|t| (now_ms - t).max(0) as u64).unwrap_or(0);
    if played_ms < cfg.min_interruption_duration_ms {
        return InterruptionDecision::Ignore;
    }
    InterruptionDecision::Interrupt
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_domain::chat::ChatContext;

    fn cfg() -> InterruptionConfig {
        InterruptionConfig {
            allow_interruptions: true,
            discard_audio_if_uninterruptible: false,
            min_interruption_duration_ms: 500,
            min_interruption_words: 2,
        }
    }

    fn speech(allow: bool) -> SpeechHandle {
        SpeechHandle::new("s1", 0, allow, 0, ChatContext::new(), None)
    }

    #[test]
    fn disallowed_speech_is_never_interrupted() {
        let s = speech(false);
        s.mark_started(0);
        assert_eq!(
            should_interrupt(&cfg(), &s, "stop stop stop", 10_000),
            InterruptionDecision::Ignore
        );
    }

    #[test]
    fn short_utterance_below_word_threshold_is_ignored() {
        let s = speech(true);
        s.mark_started(0);
        assert_eq!(should_interrupt(&cfg(), &s, "uh", 10_000), InterruptionDecision::Ignore);
    }

    #[test]
    fn too_early_in_playout_is_ignored() {
        let s = speech(true);
        s.mark_started(1_000);
        assert_eq!(
            should_interrupt(&cfg(), &s, "wait stop please", 1_100),
            InterruptionDecision::Ignore
        );
    }

    #[test]
    fn qualifying_utterance_interrupts() {
        let s = speech(true);
        s.mark_started(0);
        assert_eq!(
            should_interrupt(&cfg(), &s, "no no stop that now", 1_000),
            InterruptionDecision::Interrupt
        );
    }

    #[test]
    fn not_yet_started_speech_has_zero_played_duration() {
        let cfg = InterruptionConfig {
            min_interruption_duration_ms: 0,
            ..cfg()
        };
        let s = speech(true);
        assert_eq!(
            should_interrupt(&cfg, &s, "no no stop", 999),
            InterruptionDecision::Interrupt
        );
    }
}
