//! Consumer side of the job queue: workers claim jobs from one named queue
//! and hand them to that queue's handler.

mod thumbnail;
mod welcome;

pub use thumbnail::{render_thumbnail, ThumbnailPipeline};
pub use welcome::WelcomeNotifier;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::object_store::ObjectStoreError;
use crate::queue::{Job, JobQueue, QueueError};
use crate::state_machine::JobState;
use crate::storage::models::JobName;
use crate::storage::DatabaseError;

/// Why a job handler gave up on a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Missing {0}")]
    MissingField(&'static str),
    #[error("File not found")]
    FileNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Node has no content")]
    NoContent,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Object store error: {0}")]
    ObjectStore(#[from] ObjectStoreError),
}

/// Processes the payload of one job. Jobs may be delivered more than once, so
/// handlers must be idempotent.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), JobError>;
}

/// A single consumer loop bound to one queue.
pub struct Worker {
    queue: Arc<dyn JobQueue>,
    name: JobName,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        name: JobName,
        handler: Arc<dyn JobHandler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            name,
            handler,
            poll_interval,
        }
    }

    /// Claim and run one job. Returns the state the job ended in, or `None`
    /// if the queue was empty.
    pub async fn run_once(&self) -> Result<Option<JobState>, QueueError> {
        let Some(job) = self.queue.claim(self.name).await? else {
            return Ok(None);
        };

        debug!(job_id = %job.id, queue = self.name.as_str(), attempt = job.attempts, "Processing job");

        match self.handler.handle(&job).await {
            Ok(()) => {
                self.queue.complete(&job.id).await?;
                debug!(job_id = %job.id, queue = self.name.as_str(), "Job completed");
                Ok(Some(JobState::Completed))
            }
            Err(e) => {
                let state = self.queue.fail(&job.id, &e.to_string()).await?;
                if state.is_terminal() {
                    error!(
                        job_id = %job.id,
                        queue = self.name.as_str(),
                        attempt = job.attempts,
                        error = %e,
                        "Job failed permanently"
                    );
                } else {
                    warn!(
                        job_id = %job.id,
                        queue = self.name.as_str(),
                        attempt = job.attempts,
                        error = %e,
                        "Job failed, will retry"
                    );
                }
                Ok(Some(state))
            }
        }
    }

    /// Drain the queue until `shutdown` flips to true, sleeping while idle.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    tokio::select! {
                        _ = self.queue.wait_for_work(self.name, self.poll_interval) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(queue = self.name.as_str(), error = %e, "Queue error");
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        debug!(queue = self.name.as_str(), "Worker stopped");
    }
}

/// Start `concurrency` workers on the `name` queue.
pub fn process(
    queue: Arc<dyn JobQueue>,
    name: JobName,
    handler: Arc<dyn JobHandler>,
    concurrency: usize,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    info!(queue = name.as_str(), concurrency, "Starting workers");
    (0..concurrency)
        .map(|_| {
            let worker = Worker::new(
                Arc::clone(&queue),
                name,
                Arc::clone(&handler),
                poll_interval,
            );
            tokio::spawn(worker.run(shutdown.clone()))
        })
        .collect()
}
