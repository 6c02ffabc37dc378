//! Interactive prompt gateway contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use proxyauth_common::{PromptOutcome, PromptRequest};
use tracing::warn;

use crate::error::PromptError;

/// Shows a credential form to the user.
///
/// Implementations must settle exactly once per request: either with the
/// user's answer, an explicit [`PromptOutcome::Cancelled`], or an error when
/// the user could not be reached. An error is never treated as the user's
/// decision.
#[async_trait]
pub trait PromptGateway: Send + Sync {
    /// Presents the form and waits for the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt could not be shown or answered.
    async fn prompt(&self, request: PromptRequest) -> Result<PromptOutcome, PromptError>;
}

#[async_trait]
impl<G: PromptGateway + ?Sized> PromptGateway for Arc<G> {
    async fn prompt(&self, request: PromptRequest) -> Result<PromptOutcome, PromptError> {
        (**self).prompt(request).await
    }
}

/// Gateway wrapper that gives up on a prompt after a fixed duration.
///
/// A timeout surfaces as [`PromptError::TimedOut`], so it is not remembered
/// as a cancellation.
pub struct TimedGateway<G> {
    inner: G,
    timeout: Duration,
}

impl<G: PromptGateway> TimedGateway<G> {
    /// Wraps `inner` with a response deadline.
    pub const fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<G: PromptGateway> PromptGateway for TimedGateway<G> {
    async fn prompt(&self, request: PromptRequest) -> Result<PromptOutcome, PromptError> {
        let fingerprint = request.fingerprint.clone();
        tokio::time::timeout(self.timeout, self.inner.prompt(request))
            .await
            .unwrap_or_else(|_| {
                warn!(fingerprint = %fingerprint, timeout = ?self.timeout, "Prompt timed out");
                Err(PromptError::TimedOut(self.timeout))
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use proxyauth_common::{AuthChallenge, Credentials};

    struct Never;

    #[async_trait]
    impl PromptGateway for Never {
        async fn prompt(&self, _request: PromptRequest) -> Result<PromptOutcome, PromptError> {
            std::future::pending().await
        }
    }

    struct Immediate;

    #[async_trait]
    impl PromptGateway for Immediate {
        async fn prompt(&self, _request: PromptRequest) -> Result<PromptOutcome, PromptError> {
            Ok(PromptOutcome::Submitted {
                credentials: Credentials::new("alice", "secret"),
                remember: false,
            })
        }
    }

    fn request() -> PromptRequest {
        PromptRequest::new(
            AuthChallenge::builder().host("proxy.example").port(8080).build(),
            None,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_gateway_error() {
        let gateway = TimedGateway::new(Never, Duration::from_secs(30));

        let result = gateway.prompt(request()).await;
        assert!(matches!(result, Err(PromptError::TimedOut(d)) if d == Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_answer_passes_through() {
        let gateway = TimedGateway::new(Arc::new(Immediate), Duration::from_secs(30));

        let result = gateway.prompt(request()).await.unwrap();
        assert!(matches!(result, PromptOutcome::Submitted { remember: false, .. }));
    }
}
