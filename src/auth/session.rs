//! Session tokens backed by the session cache.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::{debug, info};

use super::password::verify_password;
use crate::cache::SessionCache;
use crate::error::{CoreError, CoreResult};
use crate::storage::Database;

/// Prefix of every session key in the cache.
pub const SESSION_KEY_PREFIX: &str = "auth_";

/// Bytes of randomness in a session token.
const TOKEN_BYTES: usize = 32;

/// Cache key under which a token's owner is stored.
pub fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

/// What a client presents to authenticate.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Email and plaintext password; yields a new session.
    Basic { email: String, password: String },
    /// A token from an earlier login.
    Token(String),
}

/// A live binding of a token to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
}

/// Issues, resolves and revokes session tokens.
pub struct Authenticator {
    db: Database,
    cache: Arc<dyn SessionCache>,
    rng: SystemRandom,
    ttl: Duration,
}

impl Authenticator {
    pub fn new(db: Database, cache: Arc<dyn SessionCache>, ttl: Duration) -> Self {
        Self {
            db,
            cache,
            rng: SystemRandom::new(),
            ttl,
        }
    }

    /// Resolve credentials to a session. Basic credentials always create a new
    /// session; a token resolves to the session it names.
    pub async fn authenticate(&self, credentials: Credentials) -> CoreResult<Session> {
        match credentials {
            Credentials::Basic { email, password } => self.login(&email, &password).await,
            Credentials::Token(token) => {
                let user_id = self.resolve(&token).await?;
                Ok(Session { token, user_id })
            }
        }
    }

    /// Check an email/password pair and open a session for it.
    pub async fn login(&self, email: &str, password: &str) -> CoreResult<Session> {
        if email.is_empty() || password.is_empty() {
            return Err(CoreError::Unauthenticated);
        }

        let user = self
            .db
            .find_user_by_email(email)?
            .ok_or(CoreError::Unauthenticated)?;

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await??;
        if !matches {
            debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(CoreError::Unauthenticated);
        }

        let token = self.generate_token()?;
        self.cache
            .set(&session_key(&token), &user.id, self.ttl)
            .await?;

        info!(user_id = %user.id, "Opened session");
        Ok(Session {
            token,
            user_id: user.id,
        })
    }

    /// Return the user bound to `token`.
    pub async fn resolve(&self, token: &str) -> CoreResult<String> {
        if token.is_empty() {
            return Err(CoreError::Unauthenticated);
        }

        self.cache
            .get(&session_key(token))
            .await?
            .ok_or(CoreError::Unauthenticated)
    }

    /// Revoke `token`. Unknown or expired tokens are rejected.
    pub async fn logout(&self, token: &str) -> CoreResult<()> {
        let user_id = self.resolve(token).await?;
        if !self.cache.del(&session_key(token)).await? {
            return Err(CoreError::Unauthenticated);
        }

        info!(user_id = %user_id, "Closed session");
        Ok(())
    }

    fn generate_token(&self) -> CoreResult<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| CoreError::Entropy)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}
