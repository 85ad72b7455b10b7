//! src/services/file_store.rs
//!
//! Metadata persistence for `StorageFile` records. The orchestrator only sees
//! the `FileStore` trait; `SqliteFileStore` is the durable implementation
//! backed by a shared SQLite pool.
//!
//! Listings are ordered by `created_at`, with SQLite's `rowid` (insertion
//! order) breaking ties so "latest" is deterministic.

use crate::models::{
    owner::OwnerRef,
    storage_file::{NewStorageFile, StorageFile},
};
use async_trait::async_trait;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");
const COLUMNS: &str = "id, owner_type, owner_id, collection, original_name, stored_name, \
                       remote_id, url, thumbnail_url, created_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn insert(&self, file: NewStorageFile) -> StoreResult<StorageFile>;

    async fn find(&self, id: Uuid) -> StoreResult<Option<StorageFile>>;

    /// Records of `owner`, oldest first. `collection == None` matches every collection.
    async fn list(&self, owner: &OwnerRef, collection: Option<&str>)
    -> StoreResult<Vec<StorageFile>>;

    /// Most recently created record of `owner` in `collection`.
    async fn latest(&self, owner: &OwnerRef, collection: &str) -> StoreResult<Option<StorageFile>>;

    /// Remove one record. Returns false when nothing matched.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}

#[derive(Clone)]
pub struct SqliteFileStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,
}

impl SqliteFileStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    fn owner_query<'a>(
        owner: &'a OwnerRef,
        collection: Option<&'a str>,
    ) -> QueryBuilder<'a, Sqlite> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT ");
        builder.push(COLUMNS);
        builder.push(" FROM storage_files WHERE owner_type = ");
        builder.push_bind(owner.owner_type.as_str());
        builder.push(" AND owner_id = ");
        builder.push_bind(owner.owner_id.as_str());
        if let Some(collection) = collection {
            builder.push(" AND collection = ");
            builder.push_bind(collection);
        }
        builder
    }
}

#[async_trait]
impl FileStore for SqliteFileStore {
    async fn insert(&self, file: NewStorageFile) -> StoreResult<StorageFile> {
        let record = sqlx::query_as::<_, StorageFile>(
            r#"
            INSERT INTO storage_files (
                id, owner_type, owner_id, collection, original_name, stored_name,
                remote_id, url, thumbnail_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, owner_type, owner_id, collection, original_name, stored_name,
                      remote_id, url, thumbnail_url, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&file.owner.owner_type)
        .bind(&file.owner.owner_id)
        .bind(&file.collection)
        .bind(&file.original_name)
        .bind(&file.stored_name)
        .bind(&file.remote_id)
        .bind(&file.url)
        .bind(&file.thumbnail_url)
        .bind(file.created_at)
        .fetch_one(&*self.db)
        .await?;

        debug!("inserted storage file {} for {}", record.id, file.owner);
        Ok(record)
    }

    async fn find(&self, id: Uuid) -> StoreResult<Option<StorageFile>> {
        let record = sqlx::query_as::<_, StorageFile>(&format!(
            "SELECT {} FROM storage_files WHERE id = ?",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    async fn list(
        &self,
        owner: &OwnerRef,
        collection: Option<&str>,
    ) -> StoreResult<Vec<StorageFile>> {
        let mut builder = Self::owner_query(owner, collection);
        builder.push(" ORDER BY created_at ASC, rowid ASC");
        let rows: Vec<StorageFile> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(rows)
    }

    async fn latest(&self, owner: &OwnerRef, collection: &str) -> StoreResult<Option<StorageFile>> {
        let mut builder = Self::owner_query(owner, Some(collection));
        builder.push(" ORDER BY created_at DESC, rowid DESC LIMIT 1");
        let row: Option<StorageFile> = builder.build_query_as().fetch_optional(&*self.db).await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM storage_files WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Apply the embedded schema. Every statement is idempotent.
pub async fn run_migrations(db: &SqlitePool) -> StoreResult<()> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
