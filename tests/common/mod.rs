#![allow(dead_code)]
//! Shared fixtures: in-memory SQLite, a scripted gateway and a recording reporter.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{
    collections::VecDeque,
    error::Error,
    sync::{Arc, Mutex},
};
use storage_up::{
    ErrorReporter, FileStore, GatewayError, Owner, OwnerRef, SqliteFileStore, StorageFile,
    StorageGateway, StorageUpClient, StorageUpConfig, StoreError, UploadedObject,
    models::storage_file::NewStorageFile, run_migrations,
};
use uuid::Uuid;

pub struct User {
    pub id: i64,
}

impl Owner for User {
    fn owner_type(&self) -> &str {
        "user"
    }

    fn owner_key(&self) -> String {
        self.id.to_string()
    }
}

pub async fn memory_pool() -> Arc<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    run_migrations(&pool).await.expect("apply schema");
    Arc::new(pool)
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadCall {
    pub file_name: String,
    pub size: usize,
    pub credential: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteCall {
    pub remote_id: String,
    pub file_name: String,
    pub credential: String,
    pub base_url: String,
}

/// Replays queued results; an empty queue means success.
#[derive(Default)]
pub struct FakeGateway {
    upload_results: Mutex<VecDeque<Result<UploadedObject, GatewayError>>>,
    delete_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    pub uploads: Mutex<Vec<UploadCall>>,
    pub deletes: Mutex<Vec<DeleteCall>>,
}

impl FakeGateway {
    pub fn push_upload(&self, result: Result<UploadedObject, GatewayError>) {
        self.upload_results.lock().unwrap().push_back(result);
    }

    pub fn push_delete(&self, result: Result<(), GatewayError>) {
        self.delete_results.lock().unwrap().push_back(result);
    }

    pub fn upload_calls(&self) -> Vec<UploadCall> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<DeleteCall> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageGateway for FakeGateway {
    async fn upload(
        &self,
        file_name: &str,
        bytes: Bytes,
        credential: &str,
        base_url: &str,
    ) -> Result<UploadedObject, GatewayError> {
        let mut calls = self.uploads.lock().unwrap();
        calls.push(UploadCall {
            file_name: file_name.to_string(),
            size: bytes.len(),
            credential: credential.to_string(),
            base_url: base_url.to_string(),
        });
        let n = calls.len();
        drop(calls);

        self.upload_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(UploadedObject {
                    stored_name: format!("stored-{}", file_name),
                    remote_id: Some(format!("remote-{}", n)),
                    url: Some(format!("https://files.example/{}", file_name)),
                    thumbnail_url: None,
                })
            })
    }

    async fn delete(
        &self,
        remote_id: &str,
        file_name: &str,
        credential: &str,
        base_url: &str,
    ) -> Result<(), GatewayError> {
        self.deletes.lock().unwrap().push(DeleteCall {
            remote_id: remote_id.to_string(),
            file_name: file_name.to_string(),
            credential: credential.to_string(),
            base_url: base_url.to_string(),
        });
        self.delete_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, err: &(dyn Error + 'static)) {
        self.reports.lock().unwrap().push(err.to_string());
    }
}

/// Reads go to SQLite; every write fails.
pub struct ReadOnlyStore {
    pub inner: Arc<SqliteFileStore>,
}

fn write_refused() -> StoreError {
    StoreError::Sqlx(sqlx::Error::Protocol("attempt to write a readonly database".into()))
}

#[async_trait]
impl FileStore for ReadOnlyStore {
    async fn insert(&self, _file: NewStorageFile) -> Result<StorageFile, StoreError> {
        Err(write_refused())
    }

    async fn find(&self, id: Uuid) -> Result<Option<StorageFile>, StoreError> {
        self.inner.find(id).await
    }

    async fn list(
        &self,
        owner: &OwnerRef,
        collection: Option<&str>,
    ) -> Result<Vec<StorageFile>, StoreError> {
        self.inner.list(owner, collection).await
    }

    async fn latest(
        &self,
        owner: &OwnerRef,
        collection: &str,
    ) -> Result<Option<StorageFile>, StoreError> {
        self.inner.latest(owner, collection).await
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, StoreError> {
        Err(write_refused())
    }
}

pub struct Harness {
    pub client: StorageUpClient,
    pub gateway: Arc<FakeGateway>,
    pub reporter: Arc<RecordingReporter>,
    pub store: Arc<SqliteFileStore>,
}

pub async fn harness() -> Harness {
    harness_with(StorageUpConfig::default()).await
}

pub async fn harness_with(config: StorageUpConfig) -> Harness {
    let store = Arc::new(SqliteFileStore::new(memory_pool().await));
    let gateway = Arc::new(FakeGateway::default());
    let reporter = Arc::new(RecordingReporter::default());
    let client = StorageUpClient::new(
        config,
        gateway.clone(),
        store.clone(),
        reporter.clone(),
    );
    Harness {
        client,
        gateway,
        reporter,
        store,
    }
}

/// Like `harness`, but the orchestrator sees a store that refuses writes.
/// `Harness::store` still points at the writable SQLite underneath.
pub async fn read_only_harness() -> Harness {
    let store = Arc::new(SqliteFileStore::new(memory_pool().await));
    let gateway = Arc::new(FakeGateway::default());
    let reporter = Arc::new(RecordingReporter::default());
    let client = StorageUpClient::new(
        StorageUpConfig::default(),
        gateway.clone(),
        Arc::new(ReadOnlyStore {
            inner: store.clone(),
        }),
        reporter.clone(),
    );
    Harness {
        client,
        gateway,
        reporter,
        store,
    }
}

pub fn new_file(
    owner: &OwnerRef,
    collection: Option<&str>,
    name: &str,
    remote_id: Option<&str>,
    created_at: DateTime<Utc>,
) -> NewStorageFile {
    NewStorageFile {
        owner: owner.clone(),
        collection: collection.map(str::to_string),
        original_name: name.to_string(),
        stored_name: format!("stored-{}", name),
        remote_id: remote_id.map(str::to_string),
        url: None,
        thumbnail_url: None,
        created_at,
    }
}
