//! Attach remotely stored files to local records.
//!
//! File bytes are sent to an HTTP storage service; only metadata (remote id,
//! URLs, collection, owner) is kept locally in SQLite.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use config::StorageUpConfig;
pub use errors::{Cause, StorageUpError, StorageUpResult};
pub use models::{
    owner::{Owner, OwnerRef},
    storage_file::StorageFile,
    upload::{UploadFile, UploadRuleError, UploadRules},
};
pub use services::{
    file_store::{FileStore, SqliteFileStore, StoreError, run_migrations},
    gateway::{GatewayError, HttpGateway, StorageGateway, UploadedObject},
    reporter::{ErrorReporter, TracingReporter},
    storage_up::{BulkDeleteReport, DeleteOverrides, FileLookup, StorageUp, StorageUpClient},
};
