//! # proxyauth-common
//!
//! Common types shared by the proxy credential resolver, its daemon and its client.
//!
//! This crate provides the data model for answering upstream proxy
//! authentication challenges:
//! - The challenge raised by the network stack and its retry counter
//! - Credentials, with the password kept behind [`secrecy::SecretString`]
//! - The fingerprint that keys every cache, store entry and in-flight resolution
//! - The request/outcome contract of an interactive credential prompt
//! - The newline-delimited JSON protocol spoken on the daemon socket
//!
//! ## Example
//!
//! ```
//! use proxyauth_common::{Attempt, AuthChallenge};
//!
//! let first = AuthChallenge::builder()
//!     .host("proxy.example")
//!     .port(8080)
//!     .build();
//!
//! let retry = first.clone().with_attempt(Attempt::Retry);
//!
//! // The attempt counter never participates in the fingerprint.
//! assert_eq!(first.fingerprint(), retry.fingerprint());
//! ```

/// Authentication challenges raised by the network layer.
pub mod challenge;
/// Username/password pairs.
pub mod credentials;
/// Stable cache keys derived from a challenge's identity.
pub mod fingerprint;
/// Interactive prompt request and outcome types.
pub mod prompt;
/// Wire protocol for the daemon's challenge socket.
pub mod protocol;

pub use challenge::{Attempt, AuthChallenge, InvalidAttempt};
pub use credentials::Credentials;
pub use fingerprint::{Fingerprint, fingerprint};
pub use prompt::{PromptOutcome, PromptRequest};
pub use protocol::{ChallengeReply, ChallengeRequest, ReplyOutcome};
