use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::object_store::{variant_key, ObjectStore, ObjectStoreError};
use crate::queue::JobQueue;
use crate::storage::models::{JobName, NewNode, NodeContent, NodeKind, NodeRecord};
use crate::storage::Database;

/// Nodes per page when listing.
pub const PAGE_SIZE: usize = 20;

/// Widths, in pixels, of the thumbnails generated for every image.
pub const THUMBNAIL_WIDTHS: [u32; 3] = [500, 250, 100];

/// Caller-supplied fields for a new node, as received and not yet validated.
#[derive(Debug, Clone, Default)]
pub struct NodeDraft {
    pub name: Option<String>,
    pub kind: Option<String>,
    /// `None` places the node at the root
    pub parent_id: Option<String>,
    pub is_public: Option<bool>,
    /// Base64-encoded content; required for files and images
    pub data: Option<String>,
}

/// Content of a file or image, ready to be served.
#[derive(Debug, Clone)]
pub struct NodeBytes {
    pub data: Bytes,
    pub content_type: String,
}

pub struct NodeService {
    db: Database,
    object_store: Arc<dyn ObjectStore>,
    queue: Arc<dyn JobQueue>,
}

impl NodeService {
    pub fn new(db: Database, object_store: Arc<dyn ObjectStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            db,
            object_store,
            queue,
        }
    }

    /// Create a folder, file, or image for `user_id`.
    pub async fn create(&self, user_id: &str, draft: NodeDraft) -> CoreResult<NodeRecord> {
        let name = draft
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| CoreError::validation("Missing name"))?;
        let kind = draft
            .kind
            .as_deref()
            .and_then(NodeKind::parse)
            .ok_or_else(|| CoreError::validation("Missing type"))?;
        let data = match (kind, draft.data.filter(|d| !d.is_empty())) {
            (NodeKind::Folder, _) => None,
            (_, Some(data)) => Some(data),
            (_, None) => return Err(CoreError::validation("Missing data")),
        };

        if let Some(parent_id) = draft.parent_id.as_deref() {
            let parent = self
                .db
                .get_owned_node(user_id, parent_id)?
                .ok_or_else(|| CoreError::NotFound("Parent not found".to_string()))?;
            if !parent.is_folder() {
                return Err(CoreError::validation("Parent is not a folder"));
            }
        }

        let mut node = NewNode {
            user_id: user_id.to_string(),
            name,
            parent_id: draft.parent_id,
            is_public: draft.is_public.unwrap_or(false),
            content: NodeContent::Folder,
        };

        let Some(data) = data else {
            let folder = self.db.insert_node(node)?;
            tracing::debug!(node_id = %folder.id, "Created folder");
            return Ok(folder);
        };

        let bytes = STANDARD
            .decode(data.as_bytes())
            .map_err(|_| CoreError::validation("Invalid data"))?;

        let content_ref = uuid::Uuid::new_v4().to_string();
        self.object_store
            .put(&content_ref, Bytes::from(bytes))
            .await?;

        node.content = match kind {
            NodeKind::Image => NodeContent::Image {
                content_ref: content_ref.clone(),
            },
            _ => NodeContent::File {
                content_ref: content_ref.clone(),
            },
        };

        let record = match self.db.insert_node(node) {
            Ok(record) => record,
            Err(e) => {
                // Best-effort cleanup of the orphaned blob
                let _ = self.object_store.delete(&content_ref).await;
                return Err(e.into());
            }
        };

        if kind == NodeKind::Image {
            let payload = json!({ "userId": record.user_id, "fileId": record.id });
            if let Err(e) = self.queue.enqueue(JobName::Thumbnail, payload).await {
                tracing::warn!(node_id = %record.id, error = %e, "Failed to enqueue thumbnail job");
            }
        }

        tracing::debug!(node_id = %record.id, kind = kind.as_str(), "Created node");
        Ok(record)
    }

    /// A node owned by `user_id`.
    pub fn get(&self, user_id: &str, node_id: &str) -> CoreResult<NodeRecord> {
        self.db
            .get_owned_node(user_id, node_id)?
            .ok_or_else(CoreError::not_found)
    }

    /// One page of the nodes `user_id` keeps under `parent_id` (root when `None`).
    /// A parent that is not an existing folder has nothing to list.
    pub fn list(
        &self,
        user_id: &str,
        parent_id: Option<&str>,
        page: usize,
    ) -> CoreResult<Vec<NodeRecord>> {
        if let Some(parent_id) = parent_id {
            match self.db.get_owned_node(user_id, parent_id)? {
                Some(parent) if parent.is_folder() => {}
                _ => return Ok(Vec::new()),
            }
        }

        Ok(self.db.list_children(
            user_id,
            parent_id,
            page.saturating_mul(PAGE_SIZE),
            PAGE_SIZE,
        )?)
    }

    /// Publish (`true`) or unpublish (`false`) a node owned by `user_id`.
    pub fn set_visibility(
        &self,
        user_id: &str,
        node_id: &str,
        is_public: bool,
    ) -> CoreResult<NodeRecord> {
        let node = self
            .db
            .set_node_visibility(user_id, node_id, is_public)?
            .ok_or_else(CoreError::not_found)?;

        tracing::debug!(node_id = %node.id, is_public, "Changed node visibility");
        Ok(node)
    }

    /// Read a node's bytes, or one of its thumbnails when `variant` names a width.
    ///
    /// Private nodes are only readable by their owner; to anyone else they do
    /// not exist.
    pub async fn read_content(
        &self,
        requestor: Option<&str>,
        node_id: &str,
        variant: Option<&str>,
    ) -> CoreResult<NodeBytes> {
        let node = self.db.get_node(node_id)?.ok_or_else(CoreError::not_found)?;

        if !node.is_public && requestor != Some(node.user_id.as_str()) {
            return Err(CoreError::not_found());
        }

        let content_ref = node.content.content_ref().ok_or_else(|| {
            CoreError::InvalidOperation("A folder doesn't have content".to_string())
        })?;

        let key = match variant {
            None => content_ref.to_string(),
            Some(size) => {
                let width = THUMBNAIL_WIDTHS
                    .into_iter()
                    .find(|w| w.to_string() == size)
                    .ok_or_else(CoreError::not_found)?;
                variant_key(content_ref, width)
            }
        };

        let data = match self.object_store.get(&key).await {
            Ok(data) => data,
            Err(ObjectStoreError::NotFound(_)) => return Err(CoreError::not_found()),
            Err(e) => return Err(e.into()),
        };

        Ok(NodeBytes {
            data,
            content_type: content_type_for(&node.name),
        })
    }
}

/// MIME type for a node name, from its extension.
pub(crate) fn content_type_for(name: &str) -> String {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    if mime.type_() == mime_guess::mime::TEXT {
        format!("{mime}; charset=utf-8")
    } else {
        mime.to_string()
    }
}
