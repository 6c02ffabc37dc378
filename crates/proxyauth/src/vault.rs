//! Encrypted credential persistence on top of a [`CredentialStore`].

use std::sync::Arc;

use proxyauth_common::{Credentials, Fingerprint};
use secrecy::SecretString;
use secrecy::zeroize::Zeroizing;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::VaultError;
use crate::store::{Cipher, CredentialStore, RememberScope};

/// Namespace prepended to every fingerprint used as a store key.
pub const KEY_PREFIX: &str = "proxy-credentials:";

/// Returns the store key for a fingerprint.
#[must_use]
pub fn store_key(fingerprint: &Fingerprint) -> String {
    format!("{KEY_PREFIX}{fingerprint}")
}

/// Plaintext layout of a remembered credential, as written.
#[derive(Serialize)]
struct StoredCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// Plaintext layout of a remembered credential, as read back.
///
/// The password is decoded straight into a [`SecretString`], escaped or not.
#[derive(Deserialize)]
struct LoadedCredentials {
    username: String,
    password: SecretString,
}

/// Reads and writes remembered credentials.
///
/// Serializes credentials to JSON, encrypts them with the configured
/// [`Cipher`] and hands the ciphertext to the [`CredentialStore`]. Plaintext
/// buffers are zeroized when dropped.
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<dyn Cipher>,
    scope: RememberScope,
}

impl CredentialVault {
    /// Creates a vault over a store and cipher.
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cipher: Arc<dyn Cipher>,
        scope: RememberScope,
    ) -> Self {
        Self {
            store,
            cipher,
            scope,
        }
    }

    /// Loads the remembered credentials for a proxy.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read, the blob cannot be
    /// decrypted, or the plaintext is not a credential pair. A missing entry
    /// is `Ok(None)`.
    #[instrument(skip_all, fields(fingerprint = %fingerprint))]
    pub async fn load(&self, fingerprint: &Fingerprint) -> Result<Option<Credentials>, VaultError> {
        let Some(blob) = self.store.get(&store_key(fingerprint)).await? else {
            debug!("No remembered credentials");
            return Ok(None);
        };

        let plaintext = Zeroizing::new(self.cipher.decrypt(&blob)?);
        let LoadedCredentials { username, password } = serde_json::from_slice(&plaintext)?;

        debug!("Loaded remembered credentials");
        Ok(Some(Credentials { username, password }))
    }

    /// Persists credentials for a proxy.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption or the store write fails.
    #[instrument(skip_all, fields(fingerprint = %fingerprint, scope = ?self.scope))]
    pub async fn save(
        &self,
        fingerprint: &Fingerprint,
        credentials: &Credentials,
    ) -> Result<(), VaultError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(&StoredCredentials {
            username: &credentials.username,
            password: credentials.password(),
        })?);
        let blob = self.cipher.encrypt(&plaintext)?;

        self.store
            .store(&store_key(fingerprint), blob, self.scope)
            .await?;

        debug!("Remembered credentials");
        Ok(())
    }

    /// Removes remembered credentials for a proxy, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    #[instrument(skip_all, fields(fingerprint = %fingerprint))]
    pub async fn forget(&self, fingerprint: &Fingerprint) -> Result<(), VaultError> {
        self.store.remove(&store_key(fingerprint)).await?;
        Ok(())
    }
}
