//! The credential resolution pipeline.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use proxyauth_common::{AuthChallenge, Credentials, Fingerprint, PromptOutcome, PromptRequest};
use tracing::{debug, info, instrument, warn};

use crate::builder::ResolverBuilder;
use crate::dialog::DialogSerializer;
use crate::events::{EventCallback, ResolverEvent};
use crate::gateway::PromptGateway;
use crate::memo::CancellationMemo;
use crate::session::SessionCache;
use crate::store::{Cipher, CredentialStore};
use crate::vault::CredentialVault;

/// One in-flight resolution, shared by every caller with the same fingerprint.
type Flight = Shared<BoxFuture<'static, Option<Credentials>>>;

/// Answers proxy authentication challenges.
///
/// Cheap to clone; clones share all state. Must be built inside a Tokio
/// runtime because the prompt queue runs on its own task.
#[derive(Clone)]
pub struct ProxyAuthResolver {
    inner: Arc<Inner>,
}

struct Inner {
    /// Credentials used for each proxy during this process.
    session: SessionCache,

    /// Proxies the user declined.
    cancelled: CancellationMemo,

    /// In-flight resolutions (fingerprint -> shared future).
    ///
    /// An entry exists exactly while its resolution runs, which is what keeps
    /// the session cache, memo and store writes for one proxy exclusive. Each
    /// flight is also driven by its own task, so it finishes and records its
    /// outcome even when the caller that started it is dropped.
    pending: DashMap<Fingerprint, Flight>,

    vault: CredentialVault,
    dialogs: DialogSerializer,
    event_callback: Option<EventCallback>,
}

impl ProxyAuthResolver {
    /// Starts building a resolver.
    #[must_use]
    pub fn builder(
        store: Arc<dyn CredentialStore>,
        cipher: Arc<dyn Cipher>,
        gateway: Arc<dyn PromptGateway>,
    ) -> ResolverBuilder {
        ResolverBuilder::new(store, cipher, gateway)
    }

    pub(crate) fn from_parts(
        vault: CredentialVault,
        dialogs: DialogSerializer,
        event_callback: Option<EventCallback>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: SessionCache::new(),
                cancelled: CancellationMemo::new(),
                pending: DashMap::new(),
                vault,
                dialogs,
                event_callback,
            }),
        }
    }

    /// Resolves credentials for a challenge.
    ///
    /// Returns `None` for origin challenges, for proxies the user declined,
    /// and whenever no credentials could be obtained. Concurrent calls for
    /// the same proxy share one resolution and get the same answer.
    #[instrument(skip_all, fields(host = %challenge.host, port = challenge.port, attempt = %challenge.attempt))]
    pub async fn resolve(&self, challenge: AuthChallenge) -> Option<Credentials> {
        if !challenge.is_proxy {
            debug!("Ignoring origin challenge");
            return None;
        }

        let fingerprint = challenge.fingerprint();

        let (flight, joined) = match self.inner.pending.entry(fingerprint.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), true),
            Entry::Vacant(entry) => {
                let inner = Arc::clone(&self.inner);
                let fp = fingerprint.clone();
                let flight = async move {
                    let resolved = inner.run(challenge, &fp).await;
                    inner.pending.remove(&fp);
                    resolved
                }
                .boxed()
                .shared();

                entry.insert(flight.clone());
                (flight, false)
            }
        };

        if joined {
            debug!(fingerprint = %fingerprint, "Joining in-flight resolution");
            self.inner.emit(ResolverEvent::Joined(fingerprint)).await;
        } else {
            // Drive the flight to completion even if every caller goes away
            tokio::spawn(flight.clone());
        }

        flight.await
    }

    /// Number of resolutions currently in flight.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Whether the user declined this proxy earlier in the process.
    #[must_use]
    pub fn is_cancelled(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.cancelled.contains(fingerprint)
    }

    /// Number of proxies with credentials cached for this session.
    #[must_use]
    pub fn session_len(&self) -> usize {
        self.inner.session.len()
    }

    /// Number of prompts waiting or on screen.
    #[must_use]
    pub fn queued_prompts(&self) -> usize {
        self.inner.dialogs.queued()
    }
}

impl Inner {
    /// Walks session cache, store, cancellation memo and prompt, in that order.
    async fn run(&self, challenge: AuthChallenge, fingerprint: &Fingerprint) -> Option<Credentials> {
        let first_attempt = !challenge.is_retry();
        let session = self.session.get(fingerprint);

        if first_attempt && let Some(credentials) = session.clone() {
            debug!(fingerprint = %fingerprint, "Answered from session cache");
            self.emit(ResolverEvent::SessionHit(fingerprint.clone())).await;
            return Some(credentials);
        }

        let stored = if first_attempt {
            self.lookup_store(fingerprint).await
        } else {
            None
        };

        if let Some(credentials) = stored {
            debug!(fingerprint = %fingerprint, "Answered from persistent store");
            self.session.insert(fingerprint.clone(), credentials.clone());
            self.emit(ResolverEvent::StoreHit(fingerprint.clone())).await;
            return Some(credentials);
        }

        if self.cancelled.contains(fingerprint) {
            debug!(fingerprint = %fingerprint, "Proxy was declined earlier, not prompting");
            return None;
        }

        self.prompt(PromptRequest::new(challenge, session)).await
    }

    /// Reads remembered credentials, treating any failure as "not found".
    async fn lookup_store(&self, fingerprint: &Fingerprint) -> Option<Credentials> {
        match self.vault.load(fingerprint).await {
            Ok(found) => found,
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "Ignoring unreadable stored credentials");
                self.emit(ResolverEvent::StoreReadFailed {
                    fingerprint: fingerprint.clone(),
                    error: e.to_string(),
                })
                .await;
                None
            }
        }
    }

    /// Queues a prompt and records what the user did.
    async fn prompt(&self, request: PromptRequest) -> Option<Credentials> {
        let fingerprint = request.fingerprint.clone();

        debug!(fingerprint = %fingerprint, prefilled = request.prefill.is_some(), "Queueing prompt");
        self.emit(ResolverEvent::Prompted(fingerprint.clone())).await;

        match self.dialogs.enqueue(request).await {
            Ok(PromptOutcome::Submitted {
                credentials,
                remember,
            }) => {
                info!(fingerprint = %fingerprint, remember, "Credentials entered");
                self.session.insert(fingerprint.clone(), credentials.clone());
                self.emit(ResolverEvent::Submitted {
                    fingerprint: fingerprint.clone(),
                    remember,
                })
                .await;

                self.persist(&fingerprint, &credentials, remember).await;
                Some(credentials)
            }
            Ok(PromptOutcome::Cancelled) => {
                info!(fingerprint = %fingerprint, "Prompt cancelled, suppressing further prompts");
                self.cancelled.add(fingerprint.clone());
                self.emit(ResolverEvent::Cancelled(fingerprint)).await;
                None
            }
            Err(e) => {
                warn!(fingerprint = %fingerprint, error = %e, "Prompt failed");
                self.emit(ResolverEvent::GatewayFailed {
                    fingerprint,
                    error: e.to_string(),
                })
                .await;
                None
            }
        }
    }

    /// Remembers or forgets credentials according to the user's choice.
    ///
    /// Failures are reported but never change what the caller receives.
    async fn persist(&self, fingerprint: &Fingerprint, credentials: &Credentials, remember: bool) {
        let result = if remember {
            self.vault.save(fingerprint, credentials).await
        } else {
            self.vault.forget(fingerprint).await
        };

        if let Err(e) = result {
            warn!(fingerprint = %fingerprint, remember, error = %e, "Failed to update stored credentials");
            self.emit(ResolverEvent::StoreWriteFailed {
                fingerprint: fingerprint.clone(),
                error: e.to_string(),
            })
            .await;
        }
    }

    async fn emit(&self, event: ResolverEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event).await;
        }
    }
}
