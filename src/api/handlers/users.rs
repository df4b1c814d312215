use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson};
use crate::api::CurrentUser;
use crate::storage::models::UserRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
        }
    }
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state
        .users
        .register(req.email.as_deref(), req.password.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.me(&user.user_id)?;
    Ok(Json(user.into()))
}
