use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::JobState;

/// Parent key used for nodes that live at the root of a user's tree.
pub const ROOT_PARENT: &str = "0";

/// Resolve an optional parent id to the key used by the children index.
pub fn parent_key(parent_id: Option<&str>) -> &str {
    parent_id.unwrap_or(ROOT_PARENT)
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Discriminant of a node, as accepted and returned on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
    Image,
}

impl NodeKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "folder" => Some(NodeKind::Folder),
            "file" => Some(NodeKind::File),
            "image" => Some(NodeKind::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Folder => "folder",
            NodeKind::File => "file",
            NodeKind::Image => "image",
        }
    }
}

/// What a node holds. Folders carry no content reference; files and images
/// always do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeContent {
    Folder,
    File { content_ref: String },
    Image { content_ref: String },
}

impl NodeContent {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeContent::Folder => NodeKind::Folder,
            NodeContent::File { .. } => NodeKind::File,
            NodeContent::Image { .. } => NodeKind::Image,
        }
    }

    /// Key of the raw bytes in the object store, if the node has any.
    pub fn content_ref(&self) -> Option<&str> {
        match self {
            NodeContent::Folder => None,
            NodeContent::File { content_ref } | NodeContent::Image { content_ref } => {
                Some(content_ref)
            }
        }
    }
}

/// A folder, file, or image owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// `None` for root-level nodes
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub content: NodeContent,
    pub created_at: DateTime<Utc>,
}

impl NodeRecord {
    pub fn kind(&self) -> NodeKind {
        self.content.kind()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.content, NodeContent::Folder)
    }
}

/// Fields supplied by the caller when inserting a node; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub user_id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub is_public: bool,
    pub content: NodeContent,
}

/// Named queues a job can be placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobName {
    Thumbnail,
    Welcome,
}

impl JobName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::Thumbnail => "thumbnail",
            JobName::Welcome => "welcome",
        }
    }
}

/// A background job as persisted by the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub name: JobName,
    pub payload: serde_json::Value,
    pub state: JobState,
    pub attempts: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
