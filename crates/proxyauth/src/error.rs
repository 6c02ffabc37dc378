//! Error types for credential storage and prompting.
//!
//! None of these escape [`ProxyAuthResolver::resolve`](crate::ProxyAuthResolver::resolve):
//! a failed lookup falls through to the next layer and a failed prompt
//! resolves to "no credentials".

use std::time::Duration;

use thiserror::Error;

/// Errors from a persistent credential store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error in a file-backed store.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend rejected or failed the operation.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors from the encryption service.
#[derive(Error, Debug)]
pub enum CipherError {
    /// The plaintext could not be sealed.
    #[error("Encryption failed: {0}")]
    Encrypt(String),

    /// The ciphertext is corrupt, truncated or was sealed with another key.
    #[error("Decryption failed: {0}")]
    Decrypt(String),
}

/// Errors from reading or writing a remembered credential.
#[derive(Error, Debug)]
pub enum VaultError {
    /// The store backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Encryption or decryption failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// The decrypted plaintext is not a serialized credential pair.
    #[error("Malformed credential entry: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors reaching the interactive prompt.
///
/// These are infrastructure failures, distinct from the user cancelling.
#[derive(Error, Debug)]
pub enum PromptError {
    /// The prompt queue or the gateway behind it is gone.
    #[error("Prompt gateway unavailable")]
    Unavailable,

    /// The gateway did not answer in time.
    #[error("Prompt timed out after {0:?}")]
    TimedOut(Duration),

    /// I/O error talking to the user.
    #[error("Prompt I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other gateway failure.
    #[error("Prompt error: {0}")]
    Other(String),
}
