//! Username/password pairs handed back to the network layer.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Credentials for an upstream proxy.
///
/// The password is wrapped in a [`SecretString`] so it is zeroized on drop and
/// never shows up in `Debug` output or logs.
#[derive(Clone)]
pub struct Credentials {
    /// Proxy username.
    pub username: String,
    /// Proxy password.
    pub password: SecretString,
}

impl Credentials {
    /// Creates credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Returns the password in the clear.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl PartialEq for Credentials {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username && self.password() == other.password()
    }
}

impl Eq for Credentials {}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
