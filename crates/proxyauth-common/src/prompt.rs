//! Interactive prompt contract.

use crate::challenge::AuthChallenge;
use crate::credentials::Credentials;
use crate::fingerprint::Fingerprint;

/// A request to show a credential-entry form for one proxy.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// The challenge being answered.
    pub challenge: AuthChallenge,
    /// Fingerprint of the challenge's proxy identity.
    pub fingerprint: Fingerprint,
    /// Values to prefill the form with, if any are known.
    pub prefill: Option<Credentials>,
}

impl PromptRequest {
    /// Creates a prompt request for a challenge.
    #[must_use]
    pub fn new(challenge: AuthChallenge, prefill: Option<Credentials>) -> Self {
        let fingerprint = challenge.fingerprint();
        Self {
            challenge,
            fingerprint,
            prefill,
        }
    }

    /// Username to show in the form, or an empty string.
    #[must_use]
    pub fn prefill_username(&self) -> &str {
        self.prefill.as_ref().map_or("", |c| c.username.as_str())
    }
}

/// What the user did with a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user entered credentials.
    Submitted {
        /// The entered credentials.
        credentials: Credentials,
        /// Whether the user asked to persist them across sessions.
        remember: bool,
    },
    /// The user dismissed the prompt without entering credentials.
    Cancelled,
}
