//! Lifecycle of a background job.
//!
//! ```text
//!            claim              succeed
//!   Queued ---------> Processing ---------> Completed
//!     ^                 |    |
//!     |  fail (retry)   |    | fail (exhausted)
//!     +-----------------+    +------------> Failed
//!     ^                 |
//!     +---- recover ----+
//! ```
//!
//! `Completed` and `Failed` are terminal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Something that happens to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// A worker picked the job up.
    Claim,
    /// The handler finished without error.
    Succeed,
    /// The handler failed; `retry` is true while attempts remain.
    Fail { retry: bool },
    /// The process restarted while the job was in flight.
    Recover,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("cannot apply {event:?} to a job in state {from:?}")]
pub struct TransitionError {
    pub from: JobState,
    pub event: JobEvent,
}

impl JobState {
    pub fn transition(self, event: JobEvent) -> Result<JobState, TransitionError> {
        match (self, event) {
            (JobState::Queued, JobEvent::Claim) => Ok(JobState::Processing),
            (JobState::Processing, JobEvent::Succeed) => Ok(JobState::Completed),
            (JobState::Processing, JobEvent::Fail { retry: true }) => Ok(JobState::Queued),
            (JobState::Processing, JobEvent::Fail { retry: false }) => Ok(JobState::Failed),
            (JobState::Processing, JobEvent::Recover) => Ok(JobState::Queued),
            (from, event) => Err(TransitionError { from, event }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let state = JobState::Queued.transition(JobEvent::Claim).unwrap();
        assert_eq!(state, JobState::Processing);
        let state = state.transition(JobEvent::Succeed).unwrap();
        assert_eq!(state, JobState::Completed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_retry_returns_to_queue() {
        let state = JobState::Processing
            .transition(JobEvent::Fail { retry: true })
            .unwrap();
        assert_eq!(state, JobState::Queued);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_exhausted_failure_is_terminal() {
        let state = JobState::Processing
            .transition(JobEvent::Fail { retry: false })
            .unwrap();
        assert_eq!(state, JobState::Failed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_recover_only_from_processing() {
        assert_eq!(
            JobState::Processing.transition(JobEvent::Recover),
            Ok(JobState::Queued)
        );
        assert!(JobState::Queued.transition(JobEvent::Recover).is_err());
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for state in [JobState::Completed, JobState::Failed] {
            for event in [
                JobEvent::Claim,
                JobEvent::Succeed,
                JobEvent::Fail { retry: true },
                JobEvent::Recover,
            ] {
                assert_eq!(
                    state.transition(event),
                    Err(TransitionError { from: state, event })
                );
            }
        }
    }

    #[test]
    fn test_cannot_complete_unclaimed_job() {
        assert!(JobState::Queued.transition(JobEvent::Succeed).is_err());
    }
}
