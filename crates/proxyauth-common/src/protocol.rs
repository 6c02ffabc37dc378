//! Daemon socket protocol.
//!
//! Clients write one JSON [`ChallengeRequest`] per line and read one JSON
//! [`ChallengeReply`] per line. Replies carry the request id because requests
//! on the same connection are resolved concurrently and may complete out of
//! order.
//!
//! ```
//! use proxyauth_common::{AuthChallenge, ChallengeRequest};
//!
//! let request = ChallengeRequest::new(
//!     AuthChallenge::builder().host("proxy.example").port(8080).build(),
//! );
//! let line = serde_json::to_string(&request).unwrap();
//! assert!(line.contains("\"attempt\":1"));
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::challenge::AuthChallenge;
use crate::credentials::Credentials;

/// A challenge submitted to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeRequest {
    /// Correlation id echoed in the reply.
    pub id: Uuid,
    /// The challenge to answer.
    pub challenge: AuthChallenge,
}

impl ChallengeRequest {
    /// Wraps a challenge with a fresh request id.
    #[must_use]
    pub fn new(challenge: AuthChallenge) -> Self {
        Self {
            id: Uuid::new_v4(),
            challenge,
        }
    }
}

/// The daemon's answer to a [`ChallengeRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeReply {
    /// Id of the request this reply answers. Nil when the request could not
    /// be parsed.
    pub id: Uuid,
    /// The outcome.
    pub outcome: ReplyOutcome,
}

/// Outcome of a challenge.
///
/// `NoCredentials` means the challenge was handled but there is nothing to
/// offer, so the request should fail with an authentication error.
/// `NotHandled` means the challenge was not a proxy challenge and the caller
/// should apply its own default handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Credentials to answer the challenge with.
    Credentials {
        /// Proxy username.
        username: String,
        /// Proxy password.
        password: String,
    },
    /// Handled, but no credentials are available.
    NoCredentials,
    /// Not a proxy challenge.
    NotHandled,
    /// The request was malformed.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl From<Option<Credentials>> for ReplyOutcome {
    fn from(resolved: Option<Credentials>) -> Self {
        match resolved {
            Some(creds) => Self::Credentials {
                password: creds.password().to_string(),
                username: creds.username,
            },
            None => Self::NoCredentials,
        }
    }
}
