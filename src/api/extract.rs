//! Request authentication extractors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::response::ApiError;
use crate::auth::Credentials;
use crate::AppState;

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-token";

/// The user bound to the request's `X-Token`. Rejects with 401 when the
/// header is missing or the token does not resolve.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub token: String,
}

/// Like [`CurrentUser`], but an absent or invalid token yields an anonymous
/// request instead of a rejection.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<String>);

fn token_from(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let token = token_from(parts).ok_or_else(ApiError::unauthorized)?;
        let session = state.auth.authenticate(Credentials::Token(token)).await?;
        Ok(CurrentUser {
            user_id: session.user_id,
            token: session.token,
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let Some(token) = token_from(parts) else {
            return Ok(MaybeUser(None));
        };

        match state.auth.resolve(&token).await {
            Ok(user_id) => Ok(MaybeUser(Some(user_id))),
            Err(e) if e.is_expected() => Ok(MaybeUser(None)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parse an `Authorization: Basic <base64(email:password)>` header value.
pub fn parse_basic_auth(header: &str) -> Option<Credentials> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;

    Some(Credentials::Basic {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Basic credentials from the request's `Authorization` header.
pub(crate) fn basic_credentials(headers: &HeaderMap) -> Option<Credentials> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_auth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(email: &str, password: &str) -> Option<(String, String)> {
        let header = format!("Basic {}", STANDARD.encode(format!("{email}:{password}")));
        match parse_basic_auth(&header)? {
            Credentials::Basic { email, password } => Some((email, password)),
            Credentials::Token(_) => None,
        }
    }

    #[test]
    fn test_parse_basic_auth() {
        assert_eq!(
            basic("bob@dylan.com", "toto1234!"),
            Some(("bob@dylan.com".into(), "toto1234!".into()))
        );
    }

    #[test]
    fn test_password_may_contain_colons() {
        assert_eq!(
            basic("a@b.com", "x:y:z"),
            Some(("a@b.com".into(), "x:y:z".into()))
        );
    }

    #[test]
    fn test_rejects_malformed_headers() {
        assert!(parse_basic_auth("Bearer abc").is_none());
        assert!(parse_basic_auth("Basic").is_none());
        assert!(parse_basic_auth("Basic !!!not-base64!!!").is_none());
        assert!(parse_basic_auth(&format!("Basic {}", STANDARD.encode("no-colon"))).is_none());
    }
}
