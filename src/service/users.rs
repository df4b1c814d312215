use std::sync::Arc;

use serde_json::json;

use crate::auth::hash_password;
use crate::error::{CoreError, CoreResult};
use crate::queue::JobQueue;
use crate::storage::models::{JobName, UserRecord};
use crate::storage::Database;

pub struct UserService {
    db: Database,
    queue: Arc<dyn JobQueue>,
}

impl UserService {
    pub fn new(db: Database, queue: Arc<dyn JobQueue>) -> Self {
        Self { db, queue }
    }

    /// Register a user and queue their welcome job.
    pub async fn register(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> CoreResult<UserRecord> {
        let email = email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| CoreError::validation("Missing email"))?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CoreError::validation("Missing password"))?;

        // insert_user enforces uniqueness; this only skips hashing for known emails
        if self.db.find_user_by_email(email)?.is_some() {
            return Err(CoreError::validation("Already exist"));
        }

        let password = password.to_string();
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let user = self
            .db
            .insert_user(email, &password_hash)?
            .ok_or_else(|| CoreError::validation("Already exist"))?;

        if let Err(e) = self
            .queue
            .enqueue(JobName::Welcome, json!({ "userId": user.id }))
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to enqueue welcome job");
        }

        tracing::debug!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Profile of the user a session is bound to.
    pub fn me(&self, user_id: &str) -> CoreResult<UserRecord> {
        self.db
            .get_user(user_id)?
            .ok_or(CoreError::Unauthenticated)
    }
}
