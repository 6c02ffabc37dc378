//! Unix socket server for handling client connections.
//!
//! Listens on a Unix domain socket and answers line-delimited JSON
//! [`ChallengeRequest`]s. Requests on one connection are resolved
//! concurrently, so a client waiting on a prompt for one proxy can still get
//! an immediate answer for another from the session cache.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proxyauth::ProxyAuthResolver;
use proxyauth_common::{ChallengeReply, ChallengeRequest, ReplyOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::error::{DaemonError, Result};

/// Maximum size of a single request line (1 MB).
const MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Daemon server state.
pub struct Server {
    /// Credential resolver shared by all connections
    resolver: ProxyAuthResolver,

    /// Socket file path
    socket_path: PathBuf,

    /// Shutdown signal broadcaster
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server.
    pub fn new(
        resolver: ProxyAuthResolver,
        socket_path: impl Into<PathBuf>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            resolver,
            socket_path: socket_path.into(),
            shutdown_tx,
        }
    }

    /// Returns the socket path.
    #[must_use]
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Runs the server.
    ///
    /// Binds to the Unix socket and accepts connections until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let socket_path = self.socket_path.as_path();

        // Subscribe before binding so a shutdown sent once clients can connect is never missed
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        if let Some(parent) = socket_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        // Remove stale socket file
        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        info!(socket_path = %socket_path.display(), "Daemon listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let server = Arc::clone(&self);
                            debug!("Client connected");
                            tokio::spawn(async move {
                                if let Err(e) = server.handle_connection(stream).await {
                                    error!(error = %e, "Connection handling error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Accept error");
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping accept loop");
                    break;
                }
            }
        }

        if socket_path.exists() {
            if let Err(e) = std::fs::remove_file(socket_path) {
                warn!("Failed to remove socket file: {e}");
            } else {
                info!("Cleaned up socket file");
            }
        }

        Ok(())
    }

    /// Handles a single client connection.
    ///
    /// Each request is resolved on its own task; replies are written by one
    /// writer task in completion order.
    #[instrument(skip_all)]
    async fn handle_connection(self: Arc<Self>, stream: UnixStream) -> Result<()> {
        let (reader, writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(Self::write_replies(writer, reply_rx));

        loop {
            match Self::read_line_limited(&mut reader, &mut line).await {
                Ok(0) => {
                    debug!("Client disconnected");
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match serde_json::from_str::<ChallengeRequest>(trimmed) {
                        Ok(request) => {
                            let resolver = self.resolver.clone();
                            let reply_tx = reply_tx.clone();
                            tokio::spawn(async move {
                                let reply = Self::answer(&resolver, request).await;
                                // Receiver is gone only if the client hung up
                                let _ = reply_tx.send(reply);
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "Invalid request");
                            let _ = reply_tx.send(ChallengeReply {
                                id: Uuid::nil(),
                                outcome: ReplyOutcome::Error {
                                    message: format!("Invalid request: {e}"),
                                },
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read request");
                    let _ = reply_tx.send(ChallengeReply {
                        id: Uuid::nil(),
                        outcome: ReplyOutcome::Error {
                            message: e.to_string(),
                        },
                    });
                    break;
                }
            }
        }

        // The writer drains once every in-flight request has replied
        drop(reply_tx);
        writer_task
            .await
            .map_err(|e| DaemonError::Other(format!("Writer task failed: {e}")))?
    }

    /// Resolves one request into its reply.
    pub async fn answer(resolver: &ProxyAuthResolver, request: ChallengeRequest) -> ChallengeReply {
        let ChallengeRequest { id, challenge } = request;

        let outcome: ReplyOutcome = if challenge.is_proxy {
            resolver.resolve(challenge).await.into()
        } else {
            ReplyOutcome::NotHandled
        };

        debug!(
            request_id = %id,
            answered = matches!(outcome, ReplyOutcome::Credentials { .. }),
            "Request resolved"
        );
        ChallengeReply { id, outcome }
    }

    async fn write_replies(
        mut writer: OwnedWriteHalf,
        mut replies: mpsc::UnboundedReceiver<ChallengeReply>,
    ) -> Result<()> {
        while let Some(reply) = replies.recv().await {
            Self::write_reply(&mut writer, &reply).await?;
        }
        writer.shutdown().await?;
        Ok(())
    }

    /// Writes a reply to the client.
    async fn write_reply(writer: &mut OwnedWriteHalf, reply: &ChallengeReply) -> Result<()> {
        let json = serde_json::to_string(reply)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Reads a newline-delimited line with a size limit.
    ///
    /// Returns the number of bytes read (0 = EOF). Errors if the
    /// line exceeds `MAX_REQUEST_SIZE` before a newline is found, or if the
    /// complete line is not UTF-8.
    async fn read_line_limited<R>(reader: &mut R, buf: &mut String) -> Result<usize>
    where
        R: AsyncBufRead + Unpin,
    {
        buf.clear();
        let mut bytes = Vec::new();

        loop {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }

            let newline_pos = available.iter().position(|&b| b == b'\n');
            let n = newline_pos.map_or(available.len(), |p| p + 1);

            if bytes.len() + n > MAX_REQUEST_SIZE {
                reader.consume(n);
                return Err(DaemonError::Other(format!(
                    "Request exceeds {MAX_REQUEST_SIZE} byte limit"
                )));
            }

            bytes.extend_from_slice(&available[..n]);
            reader.consume(n);

            if newline_pos.is_some() {
                break;
            }
        }

        let total = bytes.len();
        *buf = String::from_utf8(bytes)
            .map_err(|_| DaemonError::Other("Invalid UTF-8 in request".to_string()))?;
        Ok(total)
    }
}
