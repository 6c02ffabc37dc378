//! File-backed credential store.
//!
//! Remembered credentials live in a single JSON document mapping store keys
//! to base64 ciphertext. The daemon never sees plaintext here; sealing and
//! opening happens in the vault before a blob reaches this module.
//!
//! ## File Layout
//!
//! ```text
//! ~/.local/share/proxyauth/
//! ├── credentials.json     (store key -> encrypted entry)
//! ├── master.key           (AES-256 key, base64)
//! └── proxyauth.sock       (Unix domain socket)
//! ```
//!
//! ```json
//! {
//!   "proxy-credentials:3f2a9c41d07be815": {
//!     "blob": "q9Xk...",
//!     "scope": "user",
//!     "stored_at": "2026-03-01T09:30:00Z"
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use proxyauth::{CredentialStore, RememberScope, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{DaemonError, Result};

/// One remembered credential as written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    /// Base64 ciphertext
    blob: String,
    scope: RememberScope,
    stored_at: DateTime<Utc>,
}

type Entries = BTreeMap<String, StoredEntry>;

/// Credential file on disk.
///
/// All methods block; async callers go through [`FileCredentialStore`].
pub struct CredentialFile {
    path: PathBuf,

    /// Serializes read-modify-write cycles.
    /// `std::sync::Mutex` is correct here because these methods run on
    /// the blocking thread pool via `spawn_blocking`, not the async runtime.
    lock: Mutex<()>,
}

impl CredentialFile {
    /// Opens the credential file at `path`, creating its directory if needed.
    ///
    /// The file itself is created on first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(parent)
                .map_err(|e| {
                    DaemonError::Storage(format!("Failed to create store directory: {e}"))
                })?;
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Returns the file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the blob is
    /// not valid base64.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = self.guard()?;
        let entries = self.read_entries()?;

        entries
            .get(key)
            .map(|entry| {
                STANDARD
                    .decode(&entry.blob)
                    .map_err(|e| DaemonError::Storage(format!("Corrupt entry for {key}: {e}")))
            })
            .transpose()
    }

    /// Writes `blob` under `key`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or written.
    #[instrument(skip(self, blob), fields(size_bytes = blob.len()))]
    pub fn put(&self, key: &str, blob: &[u8], scope: RememberScope) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;

        entries.insert(
            key.to_string(),
            StoredEntry {
                blob: STANDARD.encode(blob),
                scope,
                stored_at: Utc::now(),
            },
        );
        self.write_entries(&entries)?;

        debug!(key, ?scope, path = %self.path.display(), "Stored credential entry");
        Ok(())
    }

    /// Removes `key`. Removing a missing key succeeds without touching the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or written.
    #[instrument(skip(self))]
    pub fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_entries()?;

        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
            debug!(key, "Removed credential entry");
        }
        Ok(())
    }

    /// Lists stored keys with their scope, in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn list(&self) -> Result<Vec<(String, RememberScope)>> {
        let _guard = self.guard()?;
        Ok(self
            .read_entries()?
            .into_iter()
            .map(|(key, entry)| (key, entry.scope))
            .collect())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|e| DaemonError::Storage(format!("Credential file lock poisoned: {e}")))
    }

    fn read_entries(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// [`CredentialStore`] over a [`CredentialFile`].
///
/// Cheap to clone; every operation runs on the blocking thread pool.
#[derive(Clone)]
pub struct FileCredentialStore {
    file: Arc<CredentialFile>,
}

impl FileCredentialStore {
    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            file: Arc::new(CredentialFile::open(path)?),
        })
    }

    /// Returns the underlying file.
    #[must_use]
    pub fn file(&self) -> &CredentialFile {
        &self.file
    }

    /// Runs a synchronous closure on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocking task panics or the closure fails.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&CredentialFile) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| DaemonError::Storage(format!("Task join error: {e}")))?
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StoreError> {
        let key = key.to_string();
        Ok(self.run(move |file| file.get(&key)).await?)
    }

    async fn store(
        &self,
        key: &str,
        blob: Vec<u8>,
        scope: RememberScope,
    ) -> std::result::Result<(), StoreError> {
        let key = key.to_string();
        Ok(self.run(move |file| file.put(&key, &blob, scope)).await?)
    }

    async fn remove(&self, key: &str) -> std::result::Result<(), StoreError> {
        let key = key.to_string();
        Ok(self.run(move |file| file.remove(&key)).await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use std::os::unix::fs::PermissionsExt;

    use super::*;
    use tempfile::TempDir;

    fn setup_test_store() -> (FileCredentialStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::open(temp_dir.path().join("credentials.json")).unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_put_and_get() {
        let (store, _temp) = setup_test_store();
        let file = store.file();

        file.put("proxy-credentials:a", b"\x00\x01sealed", RememberScope::User)
            .unwrap();

        assert_eq!(
            file.get("proxy-credentials:a").unwrap(),
            Some(b"\x00\x01sealed".to_vec())
        );
        assert_eq!(file.get("proxy-credentials:b").unwrap(), None);
    }

    #[test]
    fn test_get_without_file() {
        let (store, _temp) = setup_test_store();
        assert!(!store.file().path().exists());
        assert_eq!(store.file().get("anything").unwrap(), None);
    }

    #[test]
    fn test_put_replaces_entry() {
        let (store, _temp) = setup_test_store();
        let file = store.file();

        file.put("k", b"old", RememberScope::User).unwrap();
        file.put("k", b"new", RememberScope::Machine).unwrap();

        assert_eq!(file.get("k").unwrap(), Some(b"new".to_vec()));
        assert_eq!(
            file.list().unwrap(),
            vec![("k".to_string(), RememberScope::Machine)]
        );
    }

    #[test]
    fn test_remove() {
        let (store, _temp) = setup_test_store();
        let file = store.file();

        file.put("a", b"1", RememberScope::User).unwrap();
        file.put("b", b"2", RememberScope::User).unwrap();
        file.remove("a").unwrap();

        assert_eq!(file.get("a").unwrap(), None);
        assert_eq!(file.get("b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (store, _temp) = setup_test_store();
        store.file().remove("never-stored").unwrap();
        assert!(!store.file().path().exists());
    }

    #[test]
    fn test_file_is_owner_only() {
        let (store, _temp) = setup_test_store();
        store.file().put("k", b"v", RememberScope::User).unwrap();

        let mode = fs::metadata(store.file().path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!store.file().path().with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_blob_is_an_error() {
        let (store, _temp) = setup_test_store();
        fs::write(
            store.file().path(),
            r#"{"k":{"blob":"!!not base64!!","scope":"user","stored_at":"2026-01-01T00:00:00Z"}}"#,
        )
        .unwrap();

        assert!(matches!(store.file().get("k"), Err(DaemonError::Storage(_))));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let (store, _temp) = setup_test_store();
        fs::write(store.file().path(), "not json").unwrap();

        assert!(matches!(store.file().get("k"), Err(DaemonError::Json(_))));
    }

    #[tokio::test]
    async fn test_credential_store_trait() {
        let (store, _temp) = setup_test_store();
        let dyn_store: Arc<dyn CredentialStore> = Arc::new(store.clone());

        dyn_store
            .store("proxy-credentials:x", b"blob".to_vec(), RememberScope::Machine)
            .await
            .unwrap();
        assert_eq!(
            dyn_store.get("proxy-credentials:x").await.unwrap(),
            Some(b"blob".to_vec())
        );

        dyn_store.remove("proxy-credentials:x").await.unwrap();
        assert_eq!(dyn_store.get("proxy-credentials:x").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reopen_sees_entries() {
        let (store, temp) = setup_test_store();
        store
            .store("k", b"persisted".to_vec(), RememberScope::User)
            .await
            .unwrap();

        let reopened = FileCredentialStore::open(temp.path().join("credentials.json")).unwrap();
        assert_eq!(
            reopened.get("k").await.unwrap(),
            Some(b"persisted".to_vec())
        );
    }

    #[tokio::test]
    async fn test_read_error_maps_to_store_error() {
        let (store, _temp) = setup_test_store();
        fs::write(store.file().path(), "{").unwrap();

        assert!(matches!(
            store.get("k").await,
            Err(StoreError::Backend(_))
        ));
    }
}
