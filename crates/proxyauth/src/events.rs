//! Diagnostic events emitted by the resolver.
//!
//! Events are fire-and-forget notifications about how a challenge was
//! answered. The resolver awaits the callback but never changes its behavior
//! based on it. Events carry fingerprints only; credentials never leave the
//! resolver through this channel.

use std::future::Future;
use std::pin::Pin;

use proxyauth_common::Fingerprint;

/// Something notable that happened while resolving a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverEvent {
    /// A caller joined a resolution already in flight.
    Joined(Fingerprint),

    /// A first attempt was answered from the session cache.
    SessionHit(Fingerprint),

    /// A first attempt was answered from the persistent store.
    StoreHit(Fingerprint),

    /// A stored entry could not be read; the lookup fell through.
    StoreReadFailed {
        /// Proxy whose entry failed.
        fingerprint: Fingerprint,
        /// Error description.
        error: String,
    },

    /// A prompt was queued.
    Prompted(Fingerprint),

    /// The user entered credentials.
    Submitted {
        /// Proxy the credentials are for.
        fingerprint: Fingerprint,
        /// Whether the user asked to persist them.
        remember: bool,
    },

    /// The user declined; further challenges for this proxy are suppressed.
    Cancelled(Fingerprint),

    /// The prompt gateway failed; nothing was memoized.
    GatewayFailed {
        /// Proxy whose prompt failed.
        fingerprint: Fingerprint,
        /// Error description.
        error: String,
    },

    /// Persisting or forgetting a remembered credential failed.
    StoreWriteFailed {
        /// Proxy whose entry failed.
        fingerprint: Fingerprint,
        /// Error description.
        error: String,
    },
}

impl ResolverEvent {
    /// The fingerprint this event is about.
    #[must_use]
    pub const fn fingerprint(&self) -> &Fingerprint {
        match self {
            Self::Joined(fp)
            | Self::SessionHit(fp)
            | Self::StoreHit(fp)
            | Self::Prompted(fp)
            | Self::Cancelled(fp)
            | Self::StoreReadFailed { fingerprint: fp, .. }
            | Self::Submitted { fingerprint: fp, .. }
            | Self::GatewayFailed { fingerprint: fp, .. }
            | Self::StoreWriteFailed { fingerprint: fp, .. } => fp,
        }
    }
}

/// Async callback for receiving resolver events.
pub type EventCallback =
    Box<dyn Fn(ResolverEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
