//! Shared helpers for the HTTP integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderName;
use axum_test::TestServer;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use files_manager::cache::MemoryCache;
use files_manager::config::{Config, ServerConfig, StorageConfig};
use files_manager::object_store::LocalStore;
use files_manager::queue::RedbQueue;
use files_manager::storage::models::JobName;
use files_manager::storage::Database;
use files_manager::worker::{ThumbnailPipeline, Worker};
use files_manager::AppState;
use serde_json::{json, Value};

pub const X_TOKEN: HeaderName = HeaderName::from_static("x-token");

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub queue: Arc<RedbQueue>,
    pub object_store: Arc<LocalStore>,
    _dir: tempfile::TempDir,
}

pub fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let files_dir = dir.path().join("files");

    let mut config = Config {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            folder_path: files_dir.to_string_lossy().to_string(),
        },
        ..Config::default()
    };
    config.jobs.run_workers = false;

    let db = Database::open(&data_dir).unwrap();
    let object_store = Arc::new(LocalStore::new(&files_dir).unwrap());
    let queue = Arc::new(RedbQueue::new(db.clone(), config.jobs.max_attempts));

    let state = Arc::new(AppState::new(
        config,
        db,
        Arc::new(MemoryCache::new()),
        object_store.clone(),
        queue.clone(),
    ));
    let server = TestServer::new(files_manager::api::create_router(Arc::clone(&state))).unwrap();

    TestApp {
        server,
        state,
        queue,
        object_store,
        _dir: dir,
    }
}

impl TestApp {
    /// Register a user and return a session token for them.
    pub async fn signed_in(&self, email: &str, password: &str) -> String {
        self.server
            .post("/users")
            .json(&json!({ "email": email, "password": password }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        self.connect(email, password).await
    }

    pub async fn connect(&self, email: &str, password: &str) -> String {
        let response = self
            .server
            .get("/connect")
            .add_header(AUTHORIZATION, basic_auth(email, password))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn create(&self, token: &str, body: Value) -> Value {
        let response = self
            .server
            .post("/files")
            .add_header(X_TOKEN, token.to_string())
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    /// Run queued thumbnail jobs to completion.
    pub async fn drain_thumbnails(&self) -> usize {
        let pipeline = Arc::new(ThumbnailPipeline::new(
            self.state.db.clone(),
            self.object_store.clone(),
        ));
        let worker = Worker::new(
            self.queue.clone(),
            JobName::Thumbnail,
            pipeline,
            Duration::from_millis(10),
        );

        let mut processed = 0;
        while worker.run_once().await.unwrap().is_some() {
            processed += 1;
        }
        processed
    }
}

pub fn basic_auth(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
}

pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}
