//! End-of-utterance probability model (§4.6). The tokenizer + ONNX session
//! are external collaborators (out of scope per spec §1); this crate
//! defines the contract, the per-language threshold table, and dispatches
//! prediction through the sibling-process inference executor (§4.3) so the
//! model itself never runs inside the job process.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use va_domain::chat::{ChatItem, Role};
use va_domain::ChatContext;
use va_ipc::ProcJobExecutor;

/// Last N turns considered by the model (§4.6: "the last ≤4 chat turns").
const MAX_TURNS: usize = 4;

/// A probability the caller should treat as "gating disabled" — unsupported
/// language or an inference timeout both return this so the caller's
/// endpointing logic doesn't have to special-case two different failure
/// modes.
pub const DISABLED_SENTINEL: f32 = -1.0;

/// Bundled per-language `unlikely` thresholds. A probability below the
/// threshold means "the turn is unlikely to be over" and endpointing
/// should wait for `max_endpointing_delay_ms` rather than commit early.
fn default_thresholds() -> HashMap<&'static str, f32> {
    HashMap::from([
        ("en", 0.5),
        ("es", 0.5),
        ("fr", 0.5),
        ("de", 0.5),
        ("ja", 0.4),
        ("zh", 0.4),
        ("multi", 0.5),
    ])
}

#[derive(Debug, Clone)]
pub struct EouThresholds {
    table: HashMap<String, f32>,
    overrides: HashMap<String, f32>,
}

impl Default for EouThresholds {
    fn default() -> Self {
        Self {
            table: default_thresholds().into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            overrides: HashMap::new(),
        }
    }
}

impl EouThresholds {
    pub fn with_override(mut self, language: impl Into<String>, threshold: f32) -> Self {
        self.overrides.insert(language.into(), threshold);
        self
    }

    /// `None` iff neither a bundled entry nor a user override exists for
    /// `language` — the caller's `supports_language` check.
    pub fn unlikely_threshold(&self, language: &str) -> Option<f32> {
        self.overrides
            .get(language)
            .or_else(|| self.table.get(language))
            .copied()
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.unlikely_threshold(language).is_some()
    }
}

#[derive(Debug, Serialize)]
struct EouRequest {
    turns: Vec<EouTurn>,
}

#[derive(Debug, Serialize)]
struct EouTurn {
    role: &'static str,
    text: String,
}

#[derive(Debug, Deserialize)]
struct EouResponse {
    prob: f32,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::Developer => "developer",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Builds the model input: the last `MAX_TURNS` same/adjacent-role turns,
/// normalized text, with the current utterance's trailing end-marker
/// stripped (a bare heuristic here — the concrete tokenizer owns the real
/// normalization, out of scope per spec §1).
fn build_turns(chat_ctx: &ChatContext) -> Vec<EouTurn> {
    let messages: Vec<(Role, String)> = chat_ctx
        .items()
        .iter()
        .filter_map(|item| match item {
            ChatItem::Message(m) => Some((m.role, m.content.extract_text())),
            _ => None,
        })
        .collect();

    let tail: Vec<(Role, String)> = messages.into_iter().rev().take(MAX_TURNS).collect();
    tail.into_iter()
        .rev()
        .map(|(role, text)| EouTurn {
            role: role_str(role),
            text: strip_trailing_end_marker(&text),
        })
        .collect()
}

fn strip_trailing_end_marker(text: &str) -> String {
    text.trim_end_matches(['.', '!', '?', '…']).to_string()
}

/// Dispatch a prediction through the inference executor. Returns
/// [`DISABLED_SENTINEL`] if the language isn't supported or the call times
/// out — both are "don't gate on this" to the caller, never an error.
pub async fn predict_end_of_turn(
    executor: &ProcJobExecutor,
    thresholds: &EouThresholds,
    language: &str,
    chat_ctx: &ChatContext,
    timeout: Duration,
) -> f32 {
    if !thresholds.supports_language(language) {
        tracing::debug!(language, "eou: unsupported language, gating disabled");
        return DISABLED_SENTINEL;
    }

    let request = EouRequest {
        turns: build_turns(chat_ctx),
    };
    let payload = match serde_json::to_value(&request) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "eou: failed to serialize request");
            return DISABLED_SENTINEL;
        }
    };

    match tokio::time::timeout(timeout, executor.infer("eou.predict", payload)).await {
        Ok(Ok(data)) => match serde_json::from_value::<EouResponse>(data) {
            Ok(resp) => resp.prob.clamp(0.0, 1.0),
            Err(e) => {
                tracing::warn!(error = %e, "eou: malformed inference response");
                DISABLED_SENTINEL
            }
        },
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "eou: inference call failed");
            DISABLED_SENTINEL
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "eou: prediction timed out");
            DISABLED_SENTINEL
        }
    }
}

/// Whether `prob` (as returned by [`predict_end_of_turn`]) should gate
/// endpointing at all — the sentinel value always says "no".
pub fn is_gating(prob: f32) -> bool {
    prob >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use va_domain::chat::MessageContent;

    #[test]
    fn bundled_languages_have_thresholds() {
        let t = EouThresholds::default();
        assert!(t.supports_language("en"));
        assert_eq!(t.unlikely_threshold("en"), Some(0.5));
    }

    #[test]
    fn unknown_language_is_unsupported() {
        let t = EouThresholds::default();
        assert!(!t.supports_language("xx"));
    }

    #[test]
    fn user_override_wins() {
        let t = EouThresholds::default().with_override("en", 0.9);
        assert_eq!(t.unlikely_threshold("en"), Some(0.9));
    }

    #[test]
    fn override_can_support_an_unlisted_language() {
        let t = EouThresholds::default().with_override("xx", 0.3);
        assert!(t.supports_language("xx"));
    }

    #[test]
    fn build_turns_takes_last_four_and_strips_end_marker() {
        let mut ctx = ChatContext::new();
        for i in 0..6 {
            ctx.append_message(Role::User, MessageContent::Text(format!("turn {i}.")));
        }
        let turns = build_turns(&ctx);
        assert_eq!(turns.len(), MAX_TURNS);
        assert_eq!(turns.last().unwrap().text, "turn 5");
    }

    #[test]
    fn disabled_sentinel_is_not_gating() {
        assert!(!is_gating(DISABLED_SENTINEL));
        assert!(is_gating(0.0));
        assert!(is_gating(1.0));
    }
}
