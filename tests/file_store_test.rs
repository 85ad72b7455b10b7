mod common;

use chrono::{Duration, Utc};
use common::{memory_pool, new_file};
use storage_up::{FileStore, OwnerRef, SqliteFileStore, run_migrations};
use uuid::Uuid;

#[tokio::test]
async fn migrations_can_run_twice() {
    let pool = memory_pool().await;
    run_migrations(&pool).await.unwrap();
}

#[tokio::test]
async fn insert_round_trips_optional_fields() {
    let store = SqliteFileStore::new(memory_pool().await);
    let owner = OwnerRef::new("post", "42");
    let mut file = new_file(&owner, None, "photo.jpg", Some("f-1"), Utc::now());
    file.url = Some("https://files.example/photo.jpg".into());

    let record = store.insert(file).await.unwrap();
    let found = store.find(record.id).await.unwrap().unwrap();

    assert_eq!(found, record);
    assert_eq!(found.collection, None);
    assert_eq!(found.thumbnail_url, None);
    assert_eq!(found.url.as_deref(), Some("https://files.example/photo.jpg"));
}

#[tokio::test]
async fn list_filters_by_owner_and_collection_oldest_first() {
    let store = SqliteFileStore::new(memory_pool().await);
    let alice = OwnerRef::new("user", "1");
    let post = OwnerRef::new("post", "1");
    let now = Utc::now();

    store
        .insert(new_file(&alice, Some("documents"), "late.pdf", None, now))
        .await
        .unwrap();
    store
        .insert(new_file(&alice, Some("documents"), "early.pdf", None, now - Duration::minutes(5)))
        .await
        .unwrap();
    store
        .insert(new_file(&alice, Some("profile"), "me.png", None, now))
        .await
        .unwrap();
    // Same id, different owner type.
    store
        .insert(new_file(&post, Some("documents"), "other.pdf", None, now))
        .await
        .unwrap();

    let docs = store.list(&alice, Some("documents")).await.unwrap();
    let names: Vec<_> = docs.iter().map(|f| f.original_name.as_str()).collect();
    assert_eq!(names, vec!["early.pdf", "late.pdf"]);

    assert_eq!(store.list(&alice, None).await.unwrap().len(), 3);
    assert_eq!(store.list(&post, None).await.unwrap().len(), 1);
    assert!(store.list(&alice, Some("missing")).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_reports_whether_a_row_was_removed() {
    let store = SqliteFileStore::new(memory_pool().await);
    let owner = OwnerRef::new("user", "1");
    let record = store
        .insert(new_file(&owner, None, "a.txt", None, Utc::now()))
        .await
        .unwrap();

    assert!(store.delete(record.id).await.unwrap());
    assert!(!store.delete(record.id).await.unwrap());
    assert!(!store.delete(Uuid::new_v4()).await.unwrap());
    assert_eq!(store.find(record.id).await.unwrap(), None);
}
