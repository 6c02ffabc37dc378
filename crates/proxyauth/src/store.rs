//! Persistent store and encryption service contracts.
//!
//! The resolver never talks to a store directly; it goes through
//! [`CredentialVault`](crate::CredentialVault), which owns key naming,
//! serialization and encryption. Stores only ever see namespaced keys and
//! opaque ciphertext.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{CipherError, StoreError};

/// Where a remembered credential should live.
///
/// Passed through to the store on every write; how it is honored is up to
/// the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RememberScope {
    /// Visible to the current user only.
    #[default]
    User,
    /// Shared by every user of the machine.
    Machine,
}

/// Durable key/value storage for encrypted credential blobs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetches the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read. A missing key is
    /// `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Stores `blob` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn store(&self, key: &str, blob: Vec<u8>, scope: RememberScope)
    -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Symmetric encryption for persisted credentials.
pub trait Cipher: Send + Sync {
    /// Seals plaintext.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;

    /// Opens ciphertext produced by [`Cipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns an error if the ciphertext is corrupt or sealed with another key.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// In-memory [`CredentialStore`].
///
/// Clones share the same entries, so a fresh resolver built over a clone sees
/// everything a previous one remembered.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    entries: Arc<DashMap<String, (Vec<u8>, RememberScope)>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a blob is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Scope the blob under `key` was stored with.
    #[must_use]
    pub fn scope(&self, key: &str) -> Option<RememberScope> {
        self.entries.get(key).map(|e| e.value().1)
    }

    /// Number of stored blobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).map(|e| e.value().0.clone()))
    }

    async fn store(
        &self,
        key: &str,
        blob: Vec<u8>,
        scope: RememberScope,
    ) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), (blob, scope));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();

        assert!(store.get("k").await.unwrap().is_none());

        store.store("k", vec![1, 2, 3], RememberScope::Machine).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.scope("k"), Some(RememberScope::Machine));

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());

        // Removing again is a no-op.
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryCredentialStore::new();
        let clone = store.clone();

        store.store("k", vec![9], RememberScope::User).await.unwrap();
        assert!(clone.contains_key("k"));
        assert_eq!(clone.len(), 1);
    }

    #[test]
    fn test_remember_scope_serde() {
        assert_eq!(serde_json::to_string(&RememberScope::Machine).unwrap(), "\"machine\"");
        assert_eq!(
            serde_json::from_str::<RememberScope>("\"user\"").unwrap(),
            RememberScope::User
        );
    }
}
