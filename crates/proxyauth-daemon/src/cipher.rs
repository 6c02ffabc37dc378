//! AES-256-GCM encryption for remembered credentials.
//!
//! Sealed blobs are `nonce (12 bytes) || ciphertext+tag`. The 32-byte master
//! key is kept base64-encoded in an owner-only key file that is generated on
//! first start.

use std::fs;
use std::io::Write;
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use proxyauth::{Cipher, CipherError};
use secrecy::zeroize::Zeroizing;
use tracing::info;

use crate::error::{DaemonError, Result};

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;

/// [`Cipher`] backed by AES-256-GCM.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Creates a cipher from a raw 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns an error if `master_key` is not 32 bytes.
    pub fn new(master_key: &[u8]) -> Result<Self> {
        if master_key.len() != KEY_SIZE {
            return Err(DaemonError::Cipher(format!(
                "Master key must be {KEY_SIZE} bytes, got {}",
                master_key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(master_key)
            .map_err(|e| DaemonError::Cipher(format!("Invalid master key length: {e}")))?;

        Ok(Self { cipher })
    }

    /// Loads the key file at `path`, generating a fresh key if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, or does not
    /// hold a base64-encoded 32-byte key.
    pub fn from_key_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            Self::generate_key_file(path)?;
        }

        let encoded = Zeroizing::new(fs::read_to_string(path)?);
        let key = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| DaemonError::Cipher(format!("Key file is not valid base64: {e}")))?,
        );

        Self::new(&key)
    }

    fn generate_key_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::DirBuilder::new()
                .recursive(true)
                .mode(0o700)
                .create(parent)?;
        }

        let key = Aes256Gcm::generate_key(OsRng);
        let encoded = Zeroizing::new(STANDARD.encode(key.as_slice()));

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(encoded.as_bytes())?;
        file.sync_all()?;

        info!(path = %path.display(), "Generated master key");
        Ok(())
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> std::result::Result<Vec<u8>, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| CipherError::Encrypt(e.to_string()))?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(nonce.as_slice());
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> std::result::Result<Vec<u8>, CipherError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(CipherError::Decrypt("Ciphertext is too short".to_string()));
        }

        let (nonce_bytes, payload) = ciphertext.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce_bytes), payload)
            .map_err(|e| CipherError::Decrypt(e.to_string()))
    }
}
