use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, AppQuery};
use crate::api::{CurrentUser, MaybeUser};
use crate::error::CoreError;
use crate::service::NodeDraft;
use crate::storage::models::{NodeRecord, ROOT_PARENT};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResponse {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_public: bool,
    /// `0` for nodes at the root
    pub parent_id: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Accepts a string id, or `0` / `"0"` / `null` for the root
    #[serde(default)]
    pub parent_id: Option<Value>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesParams {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileDataParams {
    #[serde(default)]
    pub size: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    AppJson(req): AppJson<CreateFileRequest>,
) -> Result<(StatusCode, Json<NodeResponse>), ApiError> {
    let draft = NodeDraft {
        name: req.name,
        kind: req.kind,
        parent_id: req.parent_id.and_then(parent_from_json),
        is_public: req.is_public,
        data: req.data,
    };

    let node = match state.nodes.create(&user.user_id, draft).await {
        Ok(node) => node,
        // This route only documents 400 and 401
        Err(CoreError::NotFound(msg)) => return Err(ApiError::bad_request(msg)),
        Err(e) => return Err(e.into()),
    };

    Ok((StatusCode::CREATED, Json(node_to_response(&node))))
}

pub async fn get_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<NodeResponse>, ApiError> {
    let node = state.nodes.get(&user.user_id, &id)?;
    Ok(Json(node_to_response(&node)))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    AppQuery(params): AppQuery<ListFilesParams>,
) -> Result<Json<Vec<NodeResponse>>, ApiError> {
    let parent_id = params
        .parent_id
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != ROOT_PARENT);
    let page = params
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let nodes = state.nodes.list(&user.user_id, parent_id, page)?;
    Ok(Json(nodes.iter().map(node_to_response).collect()))
}

pub async fn publish_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<NodeResponse>, ApiError> {
    let node = state.nodes.set_visibility(&user.user_id, &id, true)?;
    Ok(Json(node_to_response(&node)))
}

pub async fn unpublish_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<NodeResponse>, ApiError> {
    let node = state.nodes.set_visibility(&user.user_id, &id, false)?;
    Ok(Json(node_to_response(&node)))
}

pub async fn get_file_data(
    State(state): State<Arc<AppState>>,
    MaybeUser(user_id): MaybeUser,
    Path(id): Path<String>,
    AppQuery(params): AppQuery<FileDataParams>,
) -> Result<Response, ApiError> {
    let content = state
        .nodes
        .read_content(user_id.as_deref(), &id, params.size.as_deref())
        .await?;

    Ok(([(header::CONTENT_TYPE, content.content_type)], content.data).into_response())
}

// ============================================================================
// Helpers
// ============================================================================

/// Normalise a JSON `parentId`; `None` means the root.
fn parent_from_json(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() || s == ROOT_PARENT => None,
        Value::String(s) => Some(s),
        Value::Number(n) if n.as_u64() == Some(0) => None,
        other => Some(other.to_string()),
    }
}

fn node_to_response(node: &NodeRecord) -> NodeResponse {
    NodeResponse {
        id: node.id.clone(),
        user_id: node.user_id.clone(),
        name: node.name.clone(),
        kind: node.kind().as_str().to_string(),
        is_public: node.is_public,
        parent_id: match &node.parent_id {
            Some(parent) => Value::String(parent.clone()),
            None => Value::from(0),
        },
    }
}
