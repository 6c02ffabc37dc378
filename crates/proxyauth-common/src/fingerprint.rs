//! Challenge fingerprinting.
//!
//! A fingerprint identifies a proxy by `(scheme, host, port)`. It is used as
//! the key of the session cache, the cancellation memo, the in-flight
//! resolution map and (prefixed) the persistent store, so it has to be stable
//! across process restarts. SHA-256 truncated to 64 bits is plenty for a cache
//! key and does not depend on the standard library's hasher seeds.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in a fingerprint.
const FINGERPRINT_BYTES: usize = 8;

/// Stable key for a proxy identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Returns the fingerprint as lowercase hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a proxy identity.
///
/// Scheme and host are compared case-insensitively.
#[must_use]
pub fn fingerprint(scheme: &str, host: &str, port: u16) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(scheme.to_ascii_lowercase().as_bytes());
    hasher.update([0]);
    hasher.update(host.to_ascii_lowercase().as_bytes());
    hasher.update([0]);
    hasher.update(port.to_be_bytes());
    let digest = hasher.finalize();

    let hex = digest[..FINGERPRINT_BYTES]
        .iter()
        .fold(String::with_capacity(FINGERPRINT_BYTES * 2), |mut out, byte| {
            use fmt::Write as _;
            let _ = write!(out, "{byte:02x}");
            out
        });

    Fingerprint(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_hex() {
        let fp = fingerprint("http", "proxy.example", 8080);
        assert_eq!(fp.as_str().len(), FINGERPRINT_BYTES * 2);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_ignores_case() {
        assert_eq!(
            fingerprint("HTTP", "Proxy.Example", 8080),
            fingerprint("http", "proxy.example", 8080)
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_fields() {
        let base = fingerprint("http", "proxy.example", 8080);
        assert_ne!(base, fingerprint("https", "proxy.example", 8080));
        assert_ne!(base, fingerprint("http", "proxy.example", 8081));
        assert_ne!(base, fingerprint("http", "other.example", 8080));
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        // Without a separator these would hash the same bytes.
        assert_ne!(fingerprint("http", "sproxy", 1), fingerprint("https", "proxy", 1));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::challenge::{Attempt, AuthChallenge};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fingerprint_is_deterministic(scheme in "[a-z]{1,8}", host in "[a-z0-9.-]{1,32}", port in any::<u16>()) {
            prop_assert_eq!(fingerprint(&scheme, &host, port), fingerprint(&scheme, &host, port));
        }

        #[test]
        fn fingerprint_ignores_attempt_and_origin(host in "[a-z0-9.-]{1,32}", port in any::<u16>(), is_proxy in any::<bool>()) {
            let first = AuthChallenge::builder()
                .host(host.clone())
                .port(port)
                .is_proxy(is_proxy)
                .build();
            let retry = AuthChallenge::builder()
                .host(host)
                .port(port)
                .attempt(Attempt::Retry)
                .build();

            prop_assert_eq!(first.fingerprint(), retry.fingerprint());
        }
    }
}
