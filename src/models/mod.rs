//! Core data models for attaching remotely stored files to local records.
//!
//! `StorageFile` maps to the `storage_files` table via `sqlx::FromRow` and
//! serializes as JSON via `serde`.

pub mod owner;
pub mod storage_file;
pub mod upload;
