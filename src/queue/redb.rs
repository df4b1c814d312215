use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{Job, JobQueue, QueueError};
use crate::state_machine::JobState;
use crate::storage::models::JobName;
use crate::storage::{Database, JobCounts};

/// Job queue persisted in the document store, so queued and in-flight jobs
/// survive restarts.
pub struct RedbQueue {
    db: Database,
    max_attempts: u32,
    wakeups: HashMap<JobName, Arc<Notify>>,
}

impl RedbQueue {
    pub fn new(db: Database, max_attempts: u32) -> Self {
        let wakeups = [JobName::Thumbnail, JobName::Welcome]
            .into_iter()
            .map(|name| (name, Arc::new(Notify::new())))
            .collect();

        Self {
            db,
            max_attempts,
            wakeups,
        }
    }

    /// Requeue jobs left in flight by a previous process.
    pub fn recover(&self) -> Result<u64, QueueError> {
        let recovered = self.db.recover_jobs()?;
        if recovered > 0 {
            tracing::info!(recovered, "Requeued interrupted jobs");
            for notify in self.wakeups.values() {
                notify.notify_waiters();
            }
        }
        Ok(recovered)
    }

    fn wakeup(&self, name: JobName) -> Option<&Arc<Notify>> {
        self.wakeups.get(&name)
    }
}

#[async_trait]
impl JobQueue for RedbQueue {
    async fn enqueue(&self, name: JobName, payload: serde_json::Value) -> Result<String, QueueError> {
        let job = self.db.enqueue_job(name, payload)?;
        if let Some(notify) = self.wakeup(name) {
            notify.notify_one();
        }
        tracing::debug!(job_id = %job.id, queue = name.as_str(), "Enqueued job");
        Ok(job.id)
    }

    async fn claim(&self, name: JobName) -> Result<Option<Job>, QueueError> {
        Ok(self.db.claim_job(name)?)
    }

    async fn complete(&self, job_id: &str) -> Result<(), QueueError> {
        if !self.db.complete_job(job_id)? {
            return Err(QueueError::UnknownJob(job_id.to_string()));
        }
        Ok(())
    }

    async fn fail(&self, job_id: &str, reason: &str) -> Result<JobState, QueueError> {
        let state = self
            .db
            .fail_job(job_id, reason, self.max_attempts)?
            .ok_or_else(|| QueueError::UnknownJob(job_id.to_string()))?;

        if state == JobState::Queued {
            if let Some(job) = self.db.get_job(job_id)? {
                if let Some(notify) = self.wakeup(job.name) {
                    notify.notify_one();
                }
            }
        }
        Ok(state)
    }

    async fn wait_for_work(&self, name: JobName, timeout: Duration) {
        match self.wakeup(name) {
            Some(notify) => {
                let _ = tokio::time::timeout(timeout, notify.notified()).await;
            }
            None => tokio::time::sleep(timeout).await,
        }
    }

    async fn counts(&self) -> Result<JobCounts, QueueError> {
        Ok(self.db.job_counts()?)
    }
}
