use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::api::{basic_credentials, CurrentUser};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Exchange Basic credentials for a session token.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let credentials = basic_credentials(&headers).ok_or_else(ApiError::unauthorized)?;
    let session = state.auth.authenticate(credentials).await?;
    Ok(Json(TokenResponse {
        token: session.token,
    }))
}

pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<StatusCode, ApiError> {
    state.auth.logout(&user.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
