mod extract;
pub mod handlers;
pub mod response;
mod routes;

pub(crate) use extract::basic_credentials;
pub use extract::{parse_basic_auth, CurrentUser, MaybeUser, TOKEN_HEADER};
pub use routes::create_router;
