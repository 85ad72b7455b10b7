//! Represents the local metadata of a file held by the remote storage service.

use super::owner::OwnerRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file attached to an owning record.
///
/// Only identity and location data live here; the bytes themselves are kept by
/// the remote storage service and addressed through `remote_id`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct StorageFile {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Discriminator of the owning entity kind (e.g. "user").
    pub owner_type: String,

    /// Primary key of the owning entity, rendered as text.
    pub owner_id: String,

    /// Logical grouping label such as "avatars". `None` means ungrouped.
    pub collection: Option<String>,

    /// Filename as supplied by the uploading client.
    pub original_name: String,

    /// Filename assigned by the remote service.
    pub stored_name: String,

    /// Remote handle of the stored object. `None` for local-only entries.
    pub remote_id: Option<String>,

    /// Public URL of the stored object.
    pub url: Option<String>,

    /// Public URL of a derived thumbnail.
    pub thumbnail_url: Option<String>,

    /// When this record was created.
    pub created_at: DateTime<Utc>,
}

impl StorageFile {
    /// The entity this file is attached to.
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type.clone(), self.owner_id.clone())
    }

    /// Whether deleting this record requires a remote acknowledgement.
    pub fn is_remote(&self) -> bool {
        self.remote_id.is_some()
    }
}

/// Values for a record about to be inserted.
#[derive(Clone, Debug)]
pub struct NewStorageFile {
    pub owner: OwnerRef,
    pub collection: Option<String>,
    pub original_name: String,
    pub stored_name: String,
    pub remote_id: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
