//! One-at-a-time prompt queue.
//!
//! Every prompt request goes through a single FIFO queue drained by one
//! worker task, so at most one prompt is on screen at any instant regardless
//! of which proxy it is for. The queue imposes no timeout of its own; a
//! gateway that never settles stalls everything behind it. Wrap such
//! gateways in [`TimedGateway`](crate::TimedGateway).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proxyauth_common::{PromptOutcome, PromptRequest};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::PromptError;
use crate::gateway::PromptGateway;

/// A queued prompt and the channel its outcome goes back on.
struct QueuedPrompt {
    request: PromptRequest,
    reply: oneshot::Sender<Result<PromptOutcome, PromptError>>,
}

/// Serializes prompts so they are shown strictly in enqueue order.
pub struct DialogSerializer {
    queue: mpsc::UnboundedSender<QueuedPrompt>,
    depth: Arc<AtomicUsize>,
}

impl DialogSerializer {
    /// Creates the queue and spawns its worker on the current Tokio runtime.
    ///
    /// The worker exits once the serializer is dropped and the queue drains.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(gateway: Arc<dyn PromptGateway>) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));

        tokio::spawn(Self::drain(gateway, rx, Arc::clone(&depth)));

        Self { queue, depth }
    }

    /// Shows queued prompts one after another.
    async fn drain(
        gateway: Arc<dyn PromptGateway>,
        mut rx: mpsc::UnboundedReceiver<QueuedPrompt>,
        depth: Arc<AtomicUsize>,
    ) {
        while let Some(QueuedPrompt { request, reply }) = rx.recv().await {
            let fingerprint = request.fingerprint.clone();
            debug!(fingerprint = %fingerprint, "Showing prompt");

            let outcome = gateway.prompt(request).await;
            depth.fetch_sub(1, Ordering::SeqCst);

            if reply.send(outcome).is_err() {
                debug!(fingerprint = %fingerprint, "Prompt requester went away");
            }
        }

        debug!("Prompt queue closed");
    }

    /// Queues a prompt and waits for its outcome.
    ///
    /// Starts immediately when nothing else is queued; otherwise waits for
    /// every earlier prompt to settle first.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::Unavailable`] if the worker is gone, or
    /// whatever error the gateway reported.
    pub async fn enqueue(&self, request: PromptRequest) -> Result<PromptOutcome, PromptError> {
        let (reply, rx) = oneshot::channel();

        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.queue.send(QueuedPrompt { request, reply }).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            warn!("Prompt queue is closed");
            return Err(PromptError::Unavailable);
        }

        rx.await.map_err(|_| {
            warn!("Prompt worker dropped the request");
            PromptError::Unavailable
        })?
    }

    /// Number of prompts waiting or on screen.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}
