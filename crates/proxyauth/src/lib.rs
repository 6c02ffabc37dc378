//! # proxyauth
//!
//! Credential resolution for upstream proxy authentication challenges.
//!
//! Many requests routed through the same proxy tend to hit its `407` at the
//! same moment. [`ProxyAuthResolver`] answers all of them with a single
//! lookup and at most one prompt:
//!
//! 1. Concurrent challenges with the same [`Fingerprint`] join one in-flight
//!    resolution and all receive its result.
//! 2. A first attempt replays credentials from the session cache, then from
//!    the encrypted persistent store.
//! 3. Proxies the user already declined are answered with "no credentials"
//!    for the rest of the process lifetime.
//! 4. Otherwise a prompt is queued. Prompts for different proxies are shown
//!    one at a time, in the order they were requested.
//!
//! A retry (attempt 2) means the proxy rejected what was offered, so the
//! caches are skipped and the user is asked again with the previous username
//! prefilled.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use proxyauth::{
//!     Cipher, CipherError, Credentials, MemoryCredentialStore, PromptError, PromptGateway,
//!     PromptOutcome, PromptRequest, ProxyAuthResolver,
//! };
//! use proxyauth_common::AuthChallenge;
//!
//! struct AlwaysAlice;
//!
//! #[async_trait]
//! impl PromptGateway for AlwaysAlice {
//!     async fn prompt(&self, _request: PromptRequest) -> Result<PromptOutcome, PromptError> {
//!         Ok(PromptOutcome::Submitted {
//!             credentials: Credentials::new("alice", "secret"),
//!             remember: false,
//!         })
//!     }
//! }
//!
//! # struct MyCipher;
//! # impl Cipher for MyCipher {
//! #     fn encrypt(&self, p: &[u8]) -> Result<Vec<u8>, CipherError> { Ok(p.to_vec()) }
//! #     fn decrypt(&self, c: &[u8]) -> Result<Vec<u8>, CipherError> { Ok(c.to_vec()) }
//! # }
//! # async fn example() {
//! let resolver = ProxyAuthResolver::builder(
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(MyCipher),
//!     Arc::new(AlwaysAlice),
//! )
//! .build();
//!
//! let challenge = AuthChallenge::builder().host("proxy.example").port(8080).build();
//! let creds = resolver.resolve(challenge).await;
//! assert_eq!(creds.map(|c| c.username), Some("alice".to_string()));
//! # }
//! ```

pub mod builder;
pub mod dialog;
pub mod error;
pub mod events;
pub mod gateway;
pub mod memo;
pub mod resolver;
pub mod session;
pub mod store;
pub mod vault;

pub use proxyauth_common::*;

pub use builder::ResolverBuilder;
pub use dialog::DialogSerializer;
pub use error::{CipherError, PromptError, StoreError, VaultError};
pub use events::{EventCallback, ResolverEvent};
pub use gateway::{PromptGateway, TimedGateway};
pub use memo::CancellationMemo;
pub use resolver::ProxyAuthResolver;
pub use session::SessionCache;
pub use store::{Cipher, CredentialStore, MemoryCredentialStore, RememberScope};
pub use vault::CredentialVault;
