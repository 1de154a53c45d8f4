//! Catalog entry types

use crate::epoch::EpochId;
use crate::expiration::ExpirationPolicy;
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

/// Metadata about a committed entry, returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    /// Size of the committed file in bytes
    pub size_bytes: u64,
    /// Hex SHA-256 of the committed content
    pub content_hash: String,
    /// When the entry was committed
    pub created_at: SystemTime,
    /// Epoch the committed file belongs to
    pub epoch: EpochId,
}

#[derive(Debug)]
pub(crate) struct CatalogEntry {
    pub path: PathBuf,
    pub info: EntryInfo,
    pub policy: Option<Box<dyn ExpirationPolicy>>,
}

impl CatalogEntry {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        match &self.policy {
            Some(policy) => policy.is_expired(now),
            None => false,
        }
    }
}

/// What a lookup hands out; the policy stays in the catalog
#[derive(Debug, Clone)]
pub struct Lookup {
    pub path: PathBuf,
    pub info: EntryInfo,
}

/// Result of publishing an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An existing entry was replaced; `merged` says whether its policy was
    /// folded into the new one
    Replaced { merged: bool },
    /// The write belongs to an epoch that was invalidated meanwhile
    StaleEpoch,
}
