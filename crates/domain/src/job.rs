//! Job identity, owned by a worker until completion or crash.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Accepted,
    Running,
    ShuttingDown,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub participant_identity: Option<String>,
    pub room_name: String,
    /// Milliseconds-since-epoch deadline by which the worker must accept.
    pub accept_deadline_ms: i64,
    pub state: JobState,
}

impl Job {
    pub fn new(id: impl Into<String>, room_name: impl Into<String>, accept_deadline_ms: i64) -> Self {
        Self {
            id: id.into(),
            participant_identity: None,
            room_name: room_name.into(),
            accept_deadline_ms,
            state: JobState::Accepted,
        }
    }

    /// Transitions are one-directional: Accepted -> Running -> ShuttingDown -> Done.
    /// Returns `false` (no-op) for an out-of-order transition.
    pub fn transition(&mut self, next: JobState) -> bool {
        let ok = matches!(
            (self.state, next),
            (JobState::Accepted, JobState::Running)
                | (JobState::Running, JobState::ShuttingDown)
                | (JobState::ShuttingDown, JobState::Done)
                | (JobState::Running, JobState::Done)
        );
        if ok {
            self.state = next;
        }
        ok
    }
}

/// Bound to a live child process once the worker accepts a job. Destroyed
/// when the child exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningJobInfo {
    pub job: Job,
    pub jwt: String,
    pub room_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_one_directional() {
        let mut job = Job::new("j1", "room", 0);
        assert!(job.transition(JobState::Running));
        assert!(!job.transition(JobState::Accepted));
        assert!(job.transition(JobState::ShuttingDown));
        assert!(job.transition(JobState::Done));
    }
}
