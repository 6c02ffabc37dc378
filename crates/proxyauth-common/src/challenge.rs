//! Authentication challenge types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::fingerprint::{Fingerprint, fingerprint};

/// Which try this is for a fingerprint within one resolution round.
///
/// Serialized as the integers `1` and `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Attempt {
    /// First try; cached or stored credentials may be replayed.
    #[default]
    First,
    /// The previous credentials were rejected by the proxy.
    Retry,
}

/// Error returned when an attempt counter is neither 1 nor 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt must be 1 or 2, got {0}")]
pub struct InvalidAttempt(pub u8);

impl TryFrom<u8> for Attempt {
    type Error = InvalidAttempt;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Retry),
            other => Err(InvalidAttempt(other)),
        }
    }
}

impl From<Attempt> for u8 {
    fn from(attempt: Attempt) -> Self {
        match attempt {
            Attempt::First => 1,
            Attempt::Retry => 2,
        }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// An authentication challenge delivered by the network layer.
///
/// Only challenges with `is_proxy` set are answered by the resolver; origin
/// (server) challenges are left to whoever raised them.
///
/// # Example
///
/// ```
/// use proxyauth_common::{Attempt, AuthChallenge};
///
/// let challenge = AuthChallenge::builder()
///     .scheme("https")
///     .host("proxy.corp.internal")
///     .port(3128)
///     .attempt(Attempt::Retry)
///     .build();
///
/// assert!(challenge.is_proxy);
/// assert!(challenge.is_retry());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct AuthChallenge {
    /// URL scheme of the proxy (`http`, `https`, `socks5`, ...).
    #[builder(default = String::from("http"), setter(into))]
    pub scheme: String,

    /// Proxy host name or address.
    #[builder(setter(into))]
    pub host: String,

    /// Proxy port.
    pub port: u16,

    /// Whether the challenge came from a proxy rather than the origin server.
    #[builder(default = true)]
    pub is_proxy: bool,

    /// Retry counter for this challenge.
    #[builder(default)]
    pub attempt: Attempt,
}

impl AuthChallenge {
    /// Computes the fingerprint of this challenge's proxy identity.
    ///
    /// Ignores `attempt` and `is_proxy`.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.scheme, &self.host, self.port)
    }

    /// Returns `true` if the previous credentials were rejected.
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.attempt == Attempt::Retry
    }

    /// Returns a copy of this challenge with a different attempt counter.
    #[must_use]
    pub fn with_attempt(mut self, attempt: Attempt) -> Self {
        self.attempt = attempt;
        self
    }
}
