use async_trait::async_trait;
use serde::Deserialize;

use super::{JobError, JobHandler};
use crate::queue::Job;
use crate::storage::Database;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WelcomePayload {
    #[serde(default)]
    user_id: Option<String>,
}

/// Greets newly registered users.
pub struct WelcomeNotifier {
    db: Database,
}

impl WelcomeNotifier {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobHandler for WelcomeNotifier {
    async fn handle(&self, job: &Job) -> Result<(), JobError> {
        let payload: WelcomePayload =
            serde_json::from_value(job.payload.clone()).unwrap_or_default();
        let user_id = payload.user_id.ok_or(JobError::MissingField("userId"))?;

        let user = self.db.get_user(&user_id)?.ok_or(JobError::UserNotFound)?;
        tracing::info!(user_id = %user.id, "Welcome {}!", user.email);
        Ok(())
    }
}
