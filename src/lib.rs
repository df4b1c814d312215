//! files-manager - Multi-user file and folder storage over HTTP
//!
//! This crate provides per-user file trees with:
//! - Email/password accounts and expiring session tokens
//! - Folders, files and images with publish/unpublish visibility
//! - Raw byte storage on the local filesystem, keyed by opaque content refs
//! - redb embedded database for users, nodes and the persistent job queue
//! - Background workers generating image thumbnails at fixed widths

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod object_store;
pub mod queue;
pub mod service;
pub mod state_machine;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod worker;

use std::sync::Arc;

use auth::Authenticator;
use cache::SessionCache;
use config::Config;
use object_store::ObjectStore;
use queue::JobQueue;
use service::{NodeService, UserService};
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub cache: Arc<dyn SessionCache>,
    pub object_store: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn JobQueue>,
    pub auth: Authenticator,
    pub users: UserService,
    pub nodes: NodeService,
}

impl AppState {
    /// Wire the services to the given stores.
    pub fn new(
        config: Config,
        db: Database,
        cache: Arc<dyn SessionCache>,
        object_store: Arc<dyn ObjectStore>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        let auth = Authenticator::new(db.clone(), Arc::clone(&cache), config.session.ttl());
        let users = UserService::new(db.clone(), Arc::clone(&queue));
        let nodes = NodeService::new(db.clone(), Arc::clone(&object_store), Arc::clone(&queue));

        Self {
            config,
            db,
            cache,
            object_store,
            queue,
            auth,
            users,
            nodes,
        }
    }
}
