//! At-least-once job delivery between producers (the services) and consumers
//! (the workers). Producers and consumers only share job payloads.

mod redb;

pub use self::redb::RedbQueue;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::state_machine::JobState;
use crate::storage::models::{JobName, JobRecord};
use crate::storage::{DatabaseError, JobCounts};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue storage error: {0}")]
    Storage(#[from] DatabaseError),
    #[error("Unknown job: {0}")]
    UnknownJob(String),
}

/// A claimed job, handed to exactly one worker at a time.
pub type Job = JobRecord;

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to the named queue. Returns the job id.
    async fn enqueue(&self, name: JobName, payload: serde_json::Value) -> Result<String, QueueError>;

    /// Take the oldest queued job of `name`, if any.
    async fn claim(&self, name: JobName) -> Result<Option<Job>, QueueError>;

    /// Acknowledge a claimed job.
    async fn complete(&self, job_id: &str) -> Result<(), QueueError>;

    /// Report a failed attempt. Returns where the job ended up: back in the
    /// queue, or parked as failed once its attempts are used up.
    async fn fail(&self, job_id: &str, reason: &str) -> Result<JobState, QueueError>;

    /// Sleep until a job of `name` may be available, or `timeout` elapses.
    async fn wait_for_work(&self, name: JobName, timeout: Duration);

    /// Jobs currently queued, in flight, or parked as failed.
    async fn counts(&self) -> Result<JobCounts, QueueError>;
}
