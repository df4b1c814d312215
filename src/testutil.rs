//! Shared test helpers for files-manager unit tests.

use std::sync::Arc;

use crate::cache::MemoryCache;
use crate::config::{Config, ServerConfig, StorageConfig};
use crate::object_store::LocalStore;
use crate::queue::RedbQueue;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database, local object store and
/// in-memory session cache. No workers are started.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let mut config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            folder_path: files_dir.to_string_lossy().to_string(),
        },
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
        ..Config::default()
    };
    config.jobs.run_workers = false;

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&files_dir).expect("Failed to create test object store");
    let queue = RedbQueue::new(db.clone(), config.jobs.max_attempts);

    Arc::new(AppState::new(
        config,
        db,
        Arc::new(MemoryCache::new()),
        Arc::new(object_store),
        Arc::new(queue),
    ))
}
