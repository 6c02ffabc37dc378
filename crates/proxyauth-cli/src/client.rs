//! Socket client for communicating with the daemon.

use std::path::Path;

use anyhow::{Context, Result, bail};
use proxyauth_common::{AuthChallenge, ChallengeReply, ChallengeRequest};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

/// Client for the proxyauth daemon socket.
pub struct DaemonClient {
    writer: OwnedWriteHalf,
    lines: Lines<BufReader<OwnedReadHalf>>,
}

/// A reply together with the line it was parsed from.
pub struct RawReply {
    pub reply: ChallengeReply,
    pub line: String,
}

impl DaemonClient {
    /// Connects to the daemon listening on `socket_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be reached.
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        log::debug!("Connecting to {}", socket_path.display());
        let stream = UnixStream::connect(socket_path).await.with_context(|| {
            format!(
                "Failed to connect to daemon at {} (is proxyauth-daemon running?)",
                socket_path.display()
            )
        })?;

        let (reader, writer) = stream.into_split();
        Ok(Self {
            writer,
            lines: BufReader::new(reader).lines(),
        })
    }

    /// Submits a challenge and waits for its reply.
    ///
    /// May block for as long as the daemon's prompt stays open.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket fails, the daemon hangs up, or the
    /// reply does not answer this request.
    pub async fn resolve(&mut self, challenge: AuthChallenge) -> Result<RawReply> {
        let request = ChallengeRequest::new(challenge);
        let mut json = serde_json::to_string(&request)?;
        json.push('\n');

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await?;
        log::debug!("Sent request {}", request.id);

        let line = self
            .lines
            .next_line()
            .await?
            .context("Daemon closed the connection without replying")?;
        let reply: ChallengeReply =
            serde_json::from_str(&line).context("Failed to parse daemon reply")?;

        if reply.id != request.id && !reply.id.is_nil() {
            bail!("Reply {} does not match request {}", reply.id, request.id);
        }

        Ok(RawReply { reply, line })
    }
}
