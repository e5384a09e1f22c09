//! IPC envelope exchanged on the parent (worker) ↔ child (job process)
//! pipe, one message per boundary (§3, §6). Transport-agnostic: the
//! `va-ipc` crate frames these as newline-delimited JSON over the child's
//! stdio, but nothing here assumes that.
//!
//! Messages are strictly ordered per direction. The first child→parent
//! message must be `InitializeResponse`; anything else is a fatal
//! handshake violation (`ProtocolError::UnexpectedFirstMessage`).

use serde::{Deserialize, Serialize};

use va_domain::RunningJobInfo;

/// Logger configuration forwarded to the child at initialize time. Shape
/// only — the child owns how it wires this into its own `tracing`
/// subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggerOptions {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "case")]
pub enum Envelope {
    #[serde(rename = "initializeRequest")]
    InitializeRequest {
        logger_options: LoggerOptions,
        ping_interval_ms: u64,
        ping_timeout_ms: u64,
        high_ping_threshold_ms: u64,
    },
    #[serde(rename = "initializeResponse")]
    InitializeResponse {},

    #[serde(rename = "pingRequest")]
    PingRequest { timestamp_ms: i64 },
    #[serde(rename = "pongResponse")]
    PongResponse {
        last_timestamp_ms: i64,
        timestamp_ms: i64,
    },

    #[serde(rename = "startJobRequest")]
    StartJobRequest { running_job: RunningJobInfo },

    #[serde(rename = "shutdownRequest")]
    ShutdownRequest {
        #[serde(default)]
        reason: Option<String>,
    },
    #[serde(rename = "exiting")]
    Exiting {
        #[serde(default)]
        reason: Option<String>,
    },
    #[serde(rename = "done")]
    Done {},

    #[serde(rename = "inferenceRequest")]
    InferenceRequest {
        method: String,
        request_id: String,
        data: serde_json::Value,
    },
    #[serde(rename = "inferenceResponse")]
    InferenceResponse {
        request_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Envelope {
    /// `true` for messages the parent sends to the child.
    pub fn is_parent_to_child(&self) -> bool {
        matches!(
            self,
            Envelope::InitializeRequest { .. }
                | Envelope::PingRequest { .. }
                | Envelope::StartJobRequest { .. }
                | Envelope::ShutdownRequest { .. }
                | Envelope::InferenceRequest { .. }
        )
    }

    pub fn is_child_to_parent(&self) -> bool {
        !self.is_parent_to_child()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("first child message must be InitializeResponse, got {0}")]
    UnexpectedFirstMessage(String),
    #[error("initialize timed out after {0}ms")]
    InitializeTimeout(u64),
    #[error("child exited unexpectedly: {0}")]
    UnexpectedExit(String),
    #[error("shutdown exceeded close_timeout_ms ({0}ms)")]
    ShutdownOverTime(u64),
    #[error("ping watchdog expired after {0}ms")]
    PingTimeout(u64),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tag used for logging/matching without constructing a value.
pub fn case_name(env: &Envelope) -> &'static str {
    match env {
        Envelope::InitializeRequest { .. } => "initializeRequest",
        Envelope::InitializeResponse {} => "initializeResponse",
        Envelope::PingRequest { .. } => "pingRequest",
        Envelope::PongResponse { .. } => "pongResponse",
        Envelope::StartJobRequest { .. } => "startJobRequest",
        Envelope::ShutdownRequest { .. } => "shutdownRequest",
        Envelope::Exiting { .. } => "exiting",
        Envelope::Done {} => "done",
        Envelope::InferenceRequest { .. } => "inferenceRequest",
        Envelope::InferenceResponse { .. } => "inferenceResponse",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let env = Envelope::PingRequest { timestamp_ms: 42 };
        let json = serde_json::to_string(&env).unwrap();
        assert!(json.contains("\"case\":\"pingRequest\""));
        let back: Envelope = serde_json::from_str(&json).unwrap();
        matches!(back, Envelope::PingRequest { timestamp_ms: 42 });
    }

    #[test]
    fn direction_classification() {
        assert!(Envelope::InitializeRequest {
            logger_options: LoggerOptions::default(),
            ping_interval_ms: 1,
            ping_timeout_ms: 1,
            high_ping_threshold_ms: 1,
        }
        .is_parent_to_child());
        assert!(Envelope::Done {}.is_child_to_parent());
    }
}
