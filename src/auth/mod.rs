//! Password hashing and session-token authentication.

mod password;
mod session;

pub use password::{hash_password, verify_password, PasswordError};
pub use session::{session_key, Authenticator, Credentials, Session, SESSION_KEY_PREFIX};
