use chrono::Utc;
use redb::ReadableTable;

use super::db::{new_record_id, Database, DatabaseError};
use super::models::UserRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // User operations
    // ========================================================================

    /// Insert a new user. Returns `None` without writing anything when the
    /// email is already registered; the check and the insert share one write
    /// transaction.
    pub fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, DatabaseError> {
        debug_assert!(!email.is_empty(), "email must not be empty");

        let write_txn = self.begin_write()?;
        let user = {
            let mut emails = write_txn.open_table(USER_EMAILS)?;
            if emails.get(email)?.is_some() {
                None
            } else {
                let user = UserRecord {
                    id: new_record_id(),
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                };

                let mut users = write_txn.open_table(USERS)?;
                let data = rmp_serde::to_vec_named(&user)?;
                users.insert(user.id.as_str(), data.as_slice())?;
                emails.insert(user.email.as_str(), user.id.as_str())?;
                Some(user)
            }
        };

        match user {
            Some(user) => {
                write_txn.commit()?;
                Ok(Some(user))
            }
            None => {
                write_txn.abort()?;
                Ok(None)
            }
        }
    }

    /// Get a user by id
    pub fn get_user(&self, id: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        match table.get(id)? {
            Some(data) => {
                let user: UserRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Get a user by email (resolves email -> id -> user)
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let emails = read_txn.open_table(USER_EMAILS)?;

        let id = match emails.get(email)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(data) => {
                let user: UserRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }
}
