//! The owning side of a stored file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything files can be attached to.
///
/// Only a type discriminator and a primary key are needed; nothing else about
/// the entity is inspected.
pub trait Owner {
    fn owner_type(&self) -> &str;
    fn owner_key(&self) -> String;
}

/// A detached owner reference, as stored alongside each file.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: String,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }

    /// Capture the identity of any [`Owner`].
    pub fn of<O: Owner + ?Sized>(owner: &O) -> Self {
        Self::new(owner.owner_type(), owner.owner_key())
    }
}

impl Owner for OwnerRef {
    fn owner_type(&self) -> &str {
        &self.owner_type
    }

    fn owner_key(&self) -> String {
        self.owner_id.clone()
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner_type, self.owner_id)
    }
}
