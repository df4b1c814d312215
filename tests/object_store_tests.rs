use bytes::Bytes;
use files_manager::object_store::{variant_key, LocalStore, ObjectStore, ObjectStoreError};

#[tokio::test]
async fn test_local_store_put_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let data = Bytes::from("hello world");
    store.put("test-key", data.clone()).await.unwrap();

    let retrieved = store.get("test-key").await.unwrap();
    assert_eq!(retrieved, data);
}

#[tokio::test]
async fn test_local_store_creates_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("files_manager");
    let store = LocalStore::new(&root).unwrap();

    store.put("ref", Bytes::from("data")).await.unwrap();
    assert!(root.join("ref").exists());
}

#[tokio::test]
async fn test_local_store_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store.put("to-delete", Bytes::from("data")).await.unwrap();
    store.delete("to-delete").await.unwrap();

    assert!(matches!(
        store.get("to-delete").await,
        Err(ObjectStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_local_store_delete_nonexistent() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    // Deleting a nonexistent key should not error
    store.delete("nonexistent").await.unwrap();
}

#[tokio::test]
async fn test_local_store_get_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let result = store.get("missing").await;
    assert!(matches!(result, Err(ObjectStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_local_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store.put("key", Bytes::from("first")).await.unwrap();
    store.put("key", Bytes::from("second")).await.unwrap();

    let data = store.get("key").await.unwrap();
    assert_eq!(data, Bytes::from("second"));
}

#[tokio::test]
async fn test_local_store_rejects_path_like_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("files")).unwrap();

    for key in ["../escape", "a/b", "a\\b", ".hidden", ""] {
        assert!(matches!(
            store.put(key, Bytes::from("x")).await,
            Err(ObjectStoreError::InvalidKey(_))
        ));
    }
    assert!(!dir.path().join("escape").exists());
}

#[tokio::test]
async fn test_variants_live_beside_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store.put("ref", Bytes::from("full")).await.unwrap();
    store
        .put(&variant_key("ref", 100), Bytes::from("small"))
        .await
        .unwrap();

    assert_eq!(store.get("ref").await.unwrap(), Bytes::from("full"));
    assert_eq!(store.get("ref_100").await.unwrap(), Bytes::from("small"));
}
