//! Runtime configuration. Every sub-config carries `serde`-visible defaults
//! so a partially-specified TOML document still produces a usable value —
//! loading that document from disk is outside this crate's scope (the
//! runtime binary owns that, and the spec treats CLI/.env loading as an
//! external concern).

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AgentSession options (§6 configuration table)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    #[serde(default = "d_true")]
    pub allow_interruptions: bool,
    #[serde(default)]
    pub discard_audio_if_uninterruptible: bool,
    #[serde(default = "d_500")]
    pub min_interruption_duration_ms: u64,
    #[serde(default = "d_0")]
    pub min_interruption_words: u32,
    #[serde(default = "d_500")]
    pub min_endpointing_delay_ms: u64,
    #[serde(default = "d_6000")]
    pub max_endpointing_delay_ms: u64,
    #[serde(default = "d_3")]
    pub max_tool_steps: u32,
    #[serde(default)]
    pub preemptive_generation: bool,
    #[serde(default = "d_600")]
    pub user_away_timeout_sec: u64,
    #[serde(default)]
    pub use_tts_aligned_transcript: bool,
    /// §4.7.2 adaptive mode — off by default, since the classifier is an
    /// external collaborator (§9 open question).
    #[serde(default)]
    pub adaptive_interruption_enabled: bool,
    #[serde(default = "d_adaptive_threshold")]
    pub adaptive_interruption_threshold: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            allow_interruptions: true,
            discard_audio_if_uninterruptible: false,
            min_interruption_duration_ms: 500,
            min_interruption_words: 0,
            min_endpointing_delay_ms: 500,
            max_endpointing_delay_ms: 6_000,
            max_tool_steps: 3,
            preemptive_generation: false,
            user_away_timeout_sec: 600,
            use_tts_aligned_transcript: false,
            adaptive_interruption_enabled: false,
            adaptive_interruption_threshold: 0.5,
        }
    }
}

fn d_adaptive_threshold() -> f32 {
    0.5
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Worker / process pool (§4.3, §4.4)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "d_3_usize")]
    pub num_idle_processes: usize,
    #[serde(default = "d_10_000")]
    pub initialize_timeout_ms: u64,
    #[serde(default = "d_2_500")]
    pub ping_interval_ms: u64,
    #[serde(default = "d_10_000")]
    pub ping_timeout_ms: u64,
    #[serde(default = "d_1_500")]
    pub high_ping_threshold_ms: u64,
    #[serde(default = "d_10_000")]
    pub close_timeout_ms: u64,
    /// Orphan watchdog armed child-side; refreshed by every `PingRequest`.
    #[serde(default = "d_15_000")]
    pub orphan_timeout_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            num_idle_processes: 3,
            initialize_timeout_ms: 10_000,
            ping_interval_ms: 2_500,
            ping_timeout_ms: 10_000,
            high_ping_threshold_ms: 1_500,
            close_timeout_ms: 10_000,
            orphan_timeout_ms: 15_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fallback adapter policy (§4.5)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackPolicy {
    #[serde(default = "d_10_000")]
    pub attempt_timeout_ms: u64,
    #[serde(default = "d_1")]
    pub max_retry_per_provider: u32,
    #[serde(default = "d_500")]
    pub retry_interval_ms: u64,
    #[serde(default = "d_30_000")]
    pub retry_cap_ms: u64,
    /// If a provider already emitted chunks before failing, keep going with
    /// the next provider instead of aborting — can splice output from two
    /// different providers mid-stream. See spec §9 open question.
    #[serde(default)]
    pub retry_on_chunk_sent: bool,
    #[serde(default = "d_5_000")]
    pub recovery_probe_timeout_ms: u64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 10_000,
            max_retry_per_provider: 1,
            retry_interval_ms: 500,
            retry_cap_ms: 30_000,
            retry_on_chunk_sent: false,
            recovery_probe_timeout_ms: 5_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interruption policy (§4.7.2), surfaced separately from SessionOptions
// so AgentActivity can clone just the gating knobs it needs.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct InterruptionConfig {
    pub allow_interruptions: bool,
    pub discard_audio_if_uninterruptible: bool,
    pub min_interruption_duration_ms: u64,
    pub min_interruption_words: u32,
    /// §4.7.2 adaptive mode: when set, an overlap classifier decides
    /// interrupt-vs-backchannel instead of the plain word/duration gate.
    /// Loosely specified by design — off unless a caller opts in.
    pub adaptive_enabled: bool,
    pub adaptive_threshold: f32,
    pub adaptive_audio_prefix_ms: u64,
}

impl From<&SessionOptions> for InterruptionConfig {
    fn from(o: &SessionOptions) -> Self {
        Self {
            allow_interruptions: o.allow_interruptions,
            discard_audio_if_uninterruptible: o.discard_audio_if_uninterruptible,
            min_interruption_duration_ms: o.min_interruption_duration_ms,
            min_interruption_words: o.min_interruption_words,
            adaptive_enabled: o.adaptive_interruption_enabled,
            adaptive_threshold: o.adaptive_interruption_threshold,
            adaptive_audio_prefix_ms: 500,
        }
    }
}

// ── default-value helper functions (serde requires fn paths, not literals) ──

fn d_true() -> bool {
    true
}
fn d_0() -> u32 {
    0
}
fn d_3() -> u32 {
    3
}
fn d_500() -> u64 {
    500
}
fn d_600() -> u64 {
    600
}
fn d_1() -> u32 {
    1
}
fn d_1_500() -> u64 {
    1_500
}
fn d_2_500() -> u64 {
    2_500
}
fn d_5_000() -> u64 {
    5_000
}
fn d_6000() -> u64 {
    6_000
}
fn d_10_000() -> u64 {
    10_000
}
fn d_15_000() -> u64 {
    15_000
}
fn d_30_000() -> u64 {
    30_000
}

// num_idle_processes default is `usize`, keep a dedicated helper.
fn d_3_usize() -> usize {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_options_defaults_match_spec() {
        let o = SessionOptions::default();
        assert_eq!(o.max_tool_steps, 3);
        assert!(o.allow_interruptions);
    }
}
