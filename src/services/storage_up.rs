//! src/services/storage_up.rs
//!
//! Upload/delete orchestration. `StorageUpClient` holds the shared, read-only
//! pieces (configuration, gateway, metadata store, reporter) and hands out a
//! fresh `StorageUp` session per logical operation.
//!
//! Session slots:
//! - `api_key`, `api_url`: sticky, kept across calls
//! - `collection`, `owner`: one-shot, cleared after every successful upload
//!
//! A remote-backed record is removed locally only after the storage service
//! confirms deletion; a failed delete leaves the row untouched.

use crate::{
    config::StorageUpConfig,
    errors::{Cause, StorageUpError, StorageUpResult},
    models::{
        owner::{Owner, OwnerRef},
        storage_file::{NewStorageFile, StorageFile},
        upload::UploadFile,
    },
    services::{
        file_store::{FileStore, SqliteFileStore},
        gateway::{GatewayError, HttpGateway, StorageGateway},
        reporter::{ErrorReporter, TracingReporter},
    },
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const MISSING_CREDENTIAL: &str =
    "credential not set: call api_key() or configure a default API key";
const MISSING_OWNER: &str = "owner not set: call for_owner() first";

/// Shared dependencies for storage sessions. Cheap to clone.
#[derive(Clone)]
pub struct StorageUpClient {
    config: Arc<StorageUpConfig>,
    gateway: Arc<dyn StorageGateway>,
    store: Arc<dyn FileStore>,
    reporter: Arc<dyn ErrorReporter>,
}

impl StorageUpClient {
    pub fn new(
        config: StorageUpConfig,
        gateway: Arc<dyn StorageGateway>,
        store: Arc<dyn FileStore>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            store,
            reporter,
        }
    }

    /// HTTP gateway, SQLite metadata and `tracing` error reports.
    pub fn from_pool(config: StorageUpConfig, db: Arc<SqlitePool>) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(&config)?;
        Ok(Self::new(
            config,
            Arc::new(gateway),
            Arc::new(SqliteFileStore::new(db)),
            Arc::new(TracingReporter),
        ))
    }

    pub fn config(&self) -> &StorageUpConfig {
        &self.config
    }

    /// Start a new session with empty slots.
    pub fn session(&self) -> StorageUp {
        StorageUp {
            shared: self.clone(),
            api_key: None,
            api_url: None,
            collection: None,
            owner: None,
        }
    }
}

/// Per-call credential/URL used when deleting a single record.
#[derive(Clone, Debug, Default)]
pub struct DeleteOverrides {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

/// Result of `StorageUp::get_file`.
#[derive(Clone, Debug, PartialEq)]
pub enum FileLookup {
    All(Vec<StorageFile>),
    Latest(Option<StorageFile>),
}

impl FileLookup {
    pub fn into_vec(self) -> Vec<StorageFile> {
        match self {
            FileLookup::All(files) => files,
            FileLookup::Latest(file) => file.into_iter().collect(),
        }
    }
}

/// Outcome of a bulk delete. Each record is attempted independently.
#[derive(Debug, Default)]
pub struct BulkDeleteReport {
    pub deleted: Vec<Uuid>,
    pub failed: Vec<(Uuid, StorageUpError)>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fluent storage session.
///
/// Setters take `&mut self`, so one session cannot be shared between callers
/// without external locking. Create one per logical operation via
/// [`StorageUpClient::session`].
pub struct StorageUp {
    shared: StorageUpClient,
    api_key: Option<String>,
    api_url: Option<String>,
    collection: Option<String>,
    owner: Option<OwnerRef>,
}

impl StorageUp {
    pub fn api_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn api_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn collection(&mut self, name: impl Into<String>) -> &mut Self {
        self.collection = Some(name.into());
        self
    }

    pub fn for_owner<O: Owner + ?Sized>(&mut self, owner: &O) -> &mut Self {
        self.owner = Some(OwnerRef::of(owner));
        self
    }

    pub fn current_collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn current_owner(&self) -> Option<&OwnerRef> {
        self.owner.as_ref()
    }

    fn resolved_api_key(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.api_key.clone())
            .or_else(|| self.shared.config.default_api_key.clone())
    }

    fn resolved_api_url(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| self.shared.config.api_url.clone())
    }

    /// Upload `file` for the current owner and collection, then record it.
    ///
    /// On success the collection and owner slots are cleared. On failure
    /// nothing is persisted and every slot keeps its value.
    pub async fn upload(
        &mut self,
        file: UploadFile,
        type_hint: Option<&str>,
    ) -> StorageUpResult<StorageFile> {
        let credential = self
            .resolved_api_key(None)
            .ok_or(StorageUpError::Configuration(MISSING_CREDENTIAL))?;
        let owner = self
            .owner
            .clone()
            .ok_or(StorageUpError::Configuration(MISSING_OWNER))?;
        let base_url = self.resolved_api_url(None);

        debug!(
            "uploading {} for {} (collection: {:?}, type: {:?})",
            file.file_name, owner, self.collection, type_hint
        );

        match self.try_upload(&file, owner, &credential, &base_url).await {
            Ok(record) => {
                self.collection = None;
                self.owner = None;
                info!(
                    "stored {} as {} (remote id {:?})",
                    record.original_name, record.stored_name, record.remote_id
                );
                Ok(record)
            }
            Err(cause) => {
                self.shared.reporter.report(&cause);
                Err(StorageUpError::UploadFailed(cause))
            }
        }
    }

    async fn try_upload(
        &self,
        file: &UploadFile,
        owner: OwnerRef,
        credential: &str,
        base_url: &str,
    ) -> Result<StorageFile, Cause> {
        let uploaded = self
            .shared
            .gateway
            .upload(&file.file_name, file.bytes.clone(), credential, base_url)
            .await?;

        let record = self
            .shared
            .store
            .insert(NewStorageFile {
                owner,
                collection: self.collection.clone(),
                original_name: file.file_name.clone(),
                stored_name: uploaded.stored_name,
                remote_id: uploaded.remote_id,
                url: uploaded.url,
                thumbnail_url: uploaded.thumbnail_url,
                created_at: Utc::now(),
            })
            .await?;
        Ok(record)
    }

    /// Files of `owner` in `collection`: every match, or only the newest one.
    pub async fn get_file<O: Owner + ?Sized>(
        &self,
        owner: &O,
        collection: &str,
        latest: bool,
    ) -> StorageUpResult<FileLookup> {
        if latest {
            Ok(FileLookup::Latest(self.latest_file(owner, collection).await?))
        } else {
            Ok(FileLookup::All(self.get_files(owner, collection).await?))
        }
    }

    pub async fn get_files<O: Owner + ?Sized>(
        &self,
        owner: &O,
        collection: &str,
    ) -> StorageUpResult<Vec<StorageFile>> {
        let owner = OwnerRef::of(owner);
        Ok(self.shared.store.list(&owner, Some(collection)).await?)
    }

    pub async fn latest_file<O: Owner + ?Sized>(
        &self,
        owner: &O,
        collection: &str,
    ) -> StorageUpResult<Option<StorageFile>> {
        let owner = OwnerRef::of(owner);
        Ok(self.shared.store.latest(&owner, collection).await?)
    }

    pub async fn delete_file(&self, file: &StorageFile) -> StorageUpResult<bool> {
        self.delete_file_with(file, &DeleteOverrides::default()).await
    }

    /// Delete one record, asking the storage service first when it holds the object.
    ///
    /// Credential and URL resolve as: `overrides`, then this session, then config.
    pub async fn delete_file_with(
        &self,
        file: &StorageFile,
        overrides: &DeleteOverrides,
    ) -> StorageUpResult<bool> {
        let Some(current) = self.shared.store.find(file.id).await? else {
            return Err(StorageUpError::FileNotFound(file.id));
        };

        let Some(remote_id) = current.remote_id.as_deref() else {
            debug!("storage file {} has no remote object, removing locally", current.id);
            return self.remove_local(current.id).await;
        };

        let credential = self
            .resolved_api_key(overrides.api_key.as_deref())
            .ok_or(StorageUpError::Configuration(MISSING_CREDENTIAL))?;
        let base_url = self.resolved_api_url(overrides.api_url.as_deref());

        if let Err(err) = self
            .shared
            .gateway
            .delete(remote_id, &current.stored_name, &credential, &base_url)
            .await
        {
            return Err(self.delete_failed(err.into()));
        }

        self.remove_local(current.id).await
    }

    async fn remove_local(&self, id: Uuid) -> StorageUpResult<bool> {
        match self.shared.store.delete(id).await {
            Ok(true) => {
                info!("deleted storage file {}", id);
                Ok(true)
            }
            Ok(false) => Err(StorageUpError::FileNotFound(id)),
            Err(err) => Err(self.delete_failed(err.into())),
        }
    }

    fn delete_failed(&self, cause: Cause) -> StorageUpError {
        self.shared.reporter.report(&cause);
        StorageUpError::DeleteFailed(cause)
    }

    /// Delete every file of `owner`, optionally limited to one collection.
    ///
    /// Records are processed one at a time; a failure is reported and
    /// collected, and the remaining records are still attempted.
    pub async fn delete_all_files<O: Owner + ?Sized>(
        &self,
        owner: &O,
        collection: Option<&str>,
    ) -> StorageUpResult<BulkDeleteReport> {
        let owner = OwnerRef::of(owner);
        let collection = collection.filter(|name| !name.is_empty());
        let files = self.shared.store.list(&owner, collection).await?;

        let mut report = BulkDeleteReport::default();
        for file in files {
            match self.delete_file(&file).await {
                Ok(_) => report.deleted.push(file.id),
                Err(err) => {
                    // DeleteFailed has already been reported
                    if !matches!(err, StorageUpError::DeleteFailed(_)) {
                        self.shared.reporter.report(&err);
                    }
                    warn!("could not delete storage file {}: {}", file.id, err);
                    report.failed.push((file.id, err));
                }
            }
        }

        info!(
            "bulk delete for {}: {} deleted, {} failed",
            owner,
            report.deleted.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
