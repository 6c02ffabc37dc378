//! Memo of proxies the user declined to authenticate.

use dashmap::DashSet;
use proxyauth_common::Fingerprint;

/// Set of fingerprints whose prompt the user dismissed.
///
/// There is no expiry and no persistence: a cancelled proxy stays cancelled
/// until the process exits.
#[derive(Default)]
pub struct CancellationMemo {
    cancelled: DashSet<Fingerprint>,
}

impl CancellationMemo {
    /// Creates an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a proxy as cancelled.
    pub fn add(&self, fingerprint: Fingerprint) {
        self.cancelled.insert(fingerprint);
    }

    /// Whether the user declined this proxy earlier.
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.cancelled.contains(fingerprint)
    }

    /// Number of cancelled proxies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cancelled.len()
    }

    /// Whether nothing has been cancelled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cancelled.is_empty()
    }
}
