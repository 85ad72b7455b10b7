use crate::services::{file_store::StoreError, gateway::GatewayError};
use thiserror::Error;
use uuid::Uuid;

/// What actually went wrong underneath an upload or delete failure.
#[derive(Debug, Error)]
pub enum Cause {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StorageUpError {
    /// Required session state is missing. Caller bug, never retried.
    #[error("configuration error: {0}")]
    Configuration(&'static str),
    #[error("storage file `{0}` not found")]
    FileNotFound(Uuid),
    #[error("Failed to upload file to storage service. {0}")]
    UploadFailed(#[source] Cause),
    #[error("Failed to delete file from storage service. {0}")]
    DeleteFailed(#[source] Cause),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StorageUpResult<T> = Result<T, StorageUpError>;

impl StorageUpError {
    /// The gateway error underneath an upload/delete failure, if any.
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            StorageUpError::UploadFailed(Cause::Gateway(err))
            | StorageUpError::DeleteFailed(Cause::Gateway(err)) => Some(err),
            _ => None,
        }
    }
}
