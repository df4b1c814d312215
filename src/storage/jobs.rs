use chrono::Utc;
use redb::{ReadableMultimapTable, ReadableTable};
use serde::Serialize;

use super::db::{new_record_id, Database, DatabaseError};
use super::models::{JobName, JobRecord};
use super::tables::*;
use crate::state_machine::{JobEvent, JobState};

/// Number of persisted jobs in each non-transient state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: u64,
    pub processing: u64,
    pub failed: u64,
}

impl Database {
    // ========================================================================
    // Job operations
    // ========================================================================

    /// Persist a new queued job
    pub fn enqueue_job(
        &self,
        name: JobName,
        payload: serde_json::Value,
    ) -> Result<JobRecord, DatabaseError> {
        let now = Utc::now();
        let job = JobRecord {
            id: new_record_id(),
            name,
            payload,
            state: JobState::Queued,
            attempts: 0,
            last_error: None,
            enqueued_at: now,
            updated_at: now,
        };

        let write_txn = self.begin_write()?;
        {
            let mut jobs = write_txn.open_table(JOBS)?;
            let data = rmp_serde::to_vec_named(&job)?;
            jobs.insert(job.id.as_str(), data.as_slice())?;

            let mut pending = write_txn.open_multimap_table(PENDING_JOBS)?;
            pending.insert(name.as_str(), job.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(job)
    }

    /// Move the oldest queued job of `name` to processing and return it
    pub fn claim_job(&self, name: JobName) -> Result<Option<JobRecord>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let claimed = {
            let mut pending = write_txn.open_multimap_table(PENDING_JOBS)?;
            let mut jobs = write_txn.open_table(JOBS)?;
            let mut claimed = None;

            loop {
                let next_id = match pending.get(name.as_str())?.next() {
                    Some(entry) => entry?.value().to_string(),
                    None => break,
                };
                pending.remove(name.as_str(), next_id.as_str())?;

                let existing = match jobs.get(next_id.as_str())? {
                    Some(data) => Some(rmp_serde::from_slice::<JobRecord>(data.value())?),
                    None => None,
                };

                // A dangling index entry is dropped and the next one tried
                let Some(mut job) = existing else {
                    continue;
                };

                job.state = job.state.transition(JobEvent::Claim)?;
                job.attempts += 1;
                job.updated_at = Utc::now();

                let data = rmp_serde::to_vec_named(&job)?;
                jobs.insert(job.id.as_str(), data.as_slice())?;
                claimed = Some(job);
                break;
            }
            claimed
        };
        write_txn.commit()?;
        Ok(claimed)
    }

    /// Mark a processing job as completed and drop its record.
    /// Returns false if the job does not exist.
    pub fn complete_job(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let completed = {
            let mut jobs = write_txn.open_table(JOBS)?;
            let existing = match jobs.get(id)? {
                Some(data) => Some(rmp_serde::from_slice::<JobRecord>(data.value())?),
                None => None,
            };

            match existing {
                Some(job) => {
                    job.state.transition(JobEvent::Succeed)?;
                    jobs.remove(id)?;
                    true
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(completed)
    }

    /// Record a failed attempt. The job goes back to the queue while
    /// `attempts < max_attempts`, otherwise it is parked as failed.
    /// Returns the resulting state, or `None` if the job does not exist.
    pub fn fail_job(
        &self,
        id: &str,
        reason: &str,
        max_attempts: u32,
    ) -> Result<Option<JobState>, DatabaseError> {
        let write_txn = self.begin_write()?;
        let state = {
            let mut jobs = write_txn.open_table(JOBS)?;
            let existing = match jobs.get(id)? {
                Some(data) => Some(rmp_serde::from_slice::<JobRecord>(data.value())?),
                None => None,
            };

            match existing {
                Some(mut job) => {
                    let retry = job.attempts < max_attempts;
                    job.state = job.state.transition(JobEvent::Fail { retry })?;
                    job.last_error = Some(reason.to_string());
                    job.updated_at = Utc::now();

                    let data = rmp_serde::to_vec_named(&job)?;
                    jobs.insert(id, data.as_slice())?;

                    if job.state == JobState::Queued {
                        let mut pending = write_txn.open_multimap_table(PENDING_JOBS)?;
                        pending.insert(job.name.as_str(), id)?;
                    }
                    Some(job.state)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(state)
    }

    /// Return every in-flight job to the queue. Called once at startup so that
    /// work interrupted by a crash is delivered again.
    pub fn recover_jobs(&self) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut recovered = 0;
        {
            let mut jobs = write_txn.open_table(JOBS)?;
            let in_flight: Vec<JobRecord> = jobs
                .iter()?
                .map(|r| {
                    r.map_err(DatabaseError::from).and_then(|(_, v)| {
                        Ok(rmp_serde::from_slice::<JobRecord>(v.value())?)
                    })
                })
                .filter(|r| {
                    r.as_ref()
                        .map(|job| job.state == JobState::Processing)
                        .unwrap_or(true)
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut pending = write_txn.open_multimap_table(PENDING_JOBS)?;
            for mut job in in_flight {
                job.state = job.state.transition(JobEvent::Recover)?;
                job.updated_at = Utc::now();
                let data = rmp_serde::to_vec_named(&job)?;
                jobs.insert(job.id.as_str(), data.as_slice())?;
                pending.insert(job.name.as_str(), job.id.as_str())?;
                recovered += 1;
            }
        }
        write_txn.commit()?;
        Ok(recovered)
    }

    /// Get a job by id
    pub fn get_job(&self, id: &str) -> Result<Option<JobRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(JOBS)?;

        match table.get(id)? {
            Some(data) => {
                let job: JobRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Tally persisted jobs by state
    pub fn job_counts(&self) -> Result<JobCounts, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(JOBS)?;

        let mut counts = JobCounts::default();
        for result in table.iter()? {
            let (_, value) = result?;
            let job: JobRecord = rmp_serde::from_slice(value.value())?;
            match job.state {
                JobState::Queued => counts.queued += 1,
                JobState::Processing => counts.processing += 1,
                JobState::Failed => counts.failed += 1,
                JobState::Completed => {}
            }
        }

        Ok(counts)
    }
}
