use bytes::Bytes;

use imagecast::application::ports::{StagingStore, StagingStoreError};
use imagecast::domain::{JobId, StoragePath};
use imagecast::infrastructure::storage::LocalStagingStore;

fn create_test_store() -> (tempfile::TempDir, LocalStagingStore) {
    let dir = tempfile::TempDir::new().unwrap();
    let store = LocalStagingStore::new(dir.path().to_path_buf()).unwrap();
    (dir, store)
}

#[tokio::test]
async fn given_bytes_when_storing_then_file_is_persisted_under_job_directory() {
    let (dir, store) = create_test_store();
    let job_id = JobId::new();
    let path = StoragePath::staged_output(&job_id, "000_photo.webp");

    let size = store
        .store(&path, Bytes::from_static(b"hello world"))
        .await
        .unwrap();

    assert_eq!(size, 11);
    let on_disk = dir
        .path()
        .join(job_id.as_uuid().to_string())
        .join("000_photo.webp");
    assert!(on_disk.exists());
}

#[tokio::test]
async fn given_stored_file_when_fetching_then_bytes_match_original() {
    let (_dir, store) = create_test_store();
    let path = StoragePath::archive(&JobId::new());

    store
        .store(&path, Bytes::from_static(b"test content"))
        .await
        .unwrap();

    let fetched = store.fetch(&path).await.unwrap();
    assert_eq!(fetched, b"test content");
}

#[tokio::test]
async fn given_stored_file_when_deleting_then_fetch_returns_not_found() {
    let (_dir, store) = create_test_store();
    let path = StoragePath::staged_output(&JobId::new(), "000_a.webp");

    store.store(&path, Bytes::from_static(b"data")).await.unwrap();
    store.delete(&path).await.unwrap();

    let result = store.fetch(&path).await;
    assert!(matches!(result, Err(StagingStoreError::NotFound(_))));
}

#[tokio::test]
async fn given_missing_file_when_deleting_then_succeeds() {
    let (_dir, store) = create_test_store();
    let path = StoragePath::staged_output(&JobId::new(), "never_written.webp");

    assert!(store.delete(&path).await.is_ok());
}

#[tokio::test]
async fn given_existing_file_when_storing_again_then_content_is_replaced() {
    let (_dir, store) = create_test_store();
    let path = StoragePath::archive(&JobId::new());

    store.store(&path, Bytes::from_static(b"first")).await.unwrap();
    store.store(&path, Bytes::from_static(b"second!")).await.unwrap();

    assert_eq!(store.fetch(&path).await.unwrap(), b"second!");
}

#[tokio::test]
async fn given_nonexistent_path_when_fetching_then_returns_not_found() {
    let (_dir, store) = create_test_store();
    let path = StoragePath::archive(&JobId::new());

    let result = store.fetch(&path).await;
    assert!(matches!(result, Err(StagingStoreError::NotFound(_))));
}
