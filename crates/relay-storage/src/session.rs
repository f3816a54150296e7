//! Persisted session: the last committed identity, or nothing.

use crate::{KeyValueStorage, StorageKeys, StorageResult};
use relay_protocol_types::Identity;
use tracing::debug;

/// High-level API over the `user` slot of a storage backend.
pub struct SessionStore {
    storage: Box<dyn KeyValueStorage>,
}

impl SessionStore {
    /// Create a session store over the given backend
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Commit `identity` as the signed-in principal, replacing any previous one.
    pub fn persist(&self, identity: &Identity) -> StorageResult<()> {
        let encoded = serde_json::to_string(identity)?;
        self.storage.set(StorageKeys::USER, &encoded)?;
        debug!(user_id = %identity.id, "Persisted session");
        Ok(())
    }

    /// Load the signed-in principal, if any.
    pub fn load(&self) -> StorageResult<Option<Identity>> {
        match self.storage.get(StorageKeys::USER)? {
            Some(encoded) => Ok(Some(serde_json::from_str(&encoded)?)),
            None => Ok(None),
        }
    }

    /// Forget the signed-in principal. Returns whether one was stored.
    pub fn clear(&self) -> StorageResult<bool> {
        let removed = self.storage.remove(StorageKeys::USER)?;
        debug!(removed, "Cleared session");
        Ok(removed)
    }

    /// Check whether a principal is stored
    pub fn has_session(&self) -> StorageResult<bool> {
        self.storage.has(StorageKeys::USER)
    }
}
