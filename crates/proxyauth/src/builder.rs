use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::dialog::DialogSerializer;
use crate::events::{EventCallback, ResolverEvent};
use crate::gateway::{PromptGateway, TimedGateway};
use crate::resolver::ProxyAuthResolver;
use crate::store::{Cipher, CredentialStore, RememberScope};
use crate::vault::CredentialVault;

/// Builder for [`ProxyAuthResolver`]
///
/// # Example
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use proxyauth::{Cipher, MemoryCredentialStore, PromptGateway, ProxyAuthResolver, RememberScope};
/// # fn example(cipher: Arc<dyn Cipher>, gateway: Arc<dyn PromptGateway>) {
/// let resolver = ProxyAuthResolver::builder(
///     Arc::new(MemoryCredentialStore::new()),
///     cipher,
///     gateway,
/// )
/// .remember_scope(RememberScope::Machine)
/// .prompt_timeout(Duration::from_secs(120))
/// .with_event_callback(|event| async move {
///     println!("{event:?}");
/// })
/// .build();
/// # }
/// ```
pub struct ResolverBuilder {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<dyn Cipher>,
    gateway: Arc<dyn PromptGateway>,
    remember_scope: RememberScope,
    prompt_timeout: Option<Duration>,
    event_callback: Option<EventCallback>,
}

impl ResolverBuilder {
    /// Create a new resolver builder
    ///
    /// # Arguments
    /// * `store` - Persistent store for remembered credentials
    /// * `cipher` - Encryption service wrapping stored entries
    /// * `gateway` - Interactive prompt shown when nothing else applies
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cipher: Arc<dyn Cipher>,
        gateway: Arc<dyn PromptGateway>,
    ) -> Self {
        Self {
            store,
            cipher,
            gateway,
            remember_scope: RememberScope::default(),
            prompt_timeout: None,
            event_callback: None,
        }
    }

    /// Set the scope remembered credentials are stored with
    #[must_use]
    pub const fn remember_scope(mut self, scope: RememberScope) -> Self {
        self.remember_scope = scope;
        self
    }

    /// Give up on an unanswered prompt after `timeout`
    ///
    /// A timed-out prompt resolves to "no credentials" without being
    /// remembered as a cancellation.
    #[must_use]
    pub const fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = Some(timeout);
        self
    }

    /// Register an async callback for diagnostic events
    #[must_use]
    pub fn with_event_callback<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(ResolverEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.event_callback = Some(Box::new(
            move |event: ResolverEvent| -> Pin<Box<dyn Future<Output = ()> + Send>> { Box::pin(callback(event)) },
        ));
        self
    }

    /// Build the resolver
    ///
    /// Spawns the prompt queue worker, so this must run inside a Tokio runtime.
    #[must_use]
    pub fn build(self) -> ProxyAuthResolver {
        let gateway: Arc<dyn PromptGateway> = match self.prompt_timeout {
            Some(timeout) => Arc::new(TimedGateway::new(self.gateway, timeout)),
            None => self.gateway,
        };

        ProxyAuthResolver::from_parts(
            CredentialVault::new(self.store, self.cipher, self.remember_scope),
            DialogSerializer::new(gateway),
            self.event_callback,
        )
    }
}
