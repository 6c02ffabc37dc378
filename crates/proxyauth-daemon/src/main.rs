//! Proxyauth Daemon
//!
//! Answers proxy authentication challenges from local clients, prompting on
//! this terminal when no remembered credentials apply.

use std::sync::Arc;
use std::time::Duration;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use proxyauth::{ProxyAuthResolver, ResolverEvent};
use proxyauth_daemon::Result;
use proxyauth_daemon::cipher::AesGcmCipher;
use proxyauth_daemon::config::DaemonConfig;
use proxyauth_daemon::prompt::TerminalPrompt;
use proxyauth_daemon::server::Server;
use proxyauth_daemon::storage::FileCredentialStore;

/// Initializes structured logging with tracing.
///
/// Supports two output formats via `PROXYAUTH_LOG_FORMAT` environment variable:
/// - `json`: Machine-readable JSON logs
/// - `pretty`: Human-readable formatted logs (default)
///
/// Log level is controlled via `RUST_LOG` environment variable.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("PROXYAUTH_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("proxyauth_daemon=info,proxyauth=info"));

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .init();
        }
    }
}

async fn log_event(event: ResolverEvent) {
    match &event {
        ResolverEvent::StoreReadFailed { .. }
        | ResolverEvent::GatewayFailed { .. }
        | ResolverEvent::StoreWriteFailed { .. } => {
            info!(fingerprint = %event.fingerprint(), ?event, "Resolver degraded");
        }
        _ => debug!(fingerprint = %event.fingerprint(), ?event, "Resolver event"),
    }
}

/// How long shutdown waits for blocking work, such as a terminal read that
/// nobody will answer.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    init_tracing();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(run());
    finish(runtime);
    result
}

/// Shuts the runtime down without waiting on a pending prompt.
fn finish(runtime: Runtime) {
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
}

async fn run() -> Result<()> {
    info!("Starting proxyauth daemon");

    let config = match DaemonConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            error!("Expected config at: {:?}", DaemonConfig::config_path());
            return Err(e);
        }
    };

    let store_path = config.store_path()?;
    let store = match FileCredentialStore::open(&store_path) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to open credential store: {e}");
            return Err(e);
        }
    };
    info!("Credential store at {}", store_path.display());

    let key_path = config.key_file_path()?;
    let cipher = match AesGcmCipher::from_key_file(&key_path) {
        Ok(cipher) => cipher,
        Err(e) => {
            error!("Failed to load master key from {}: {e}", key_path.display());
            return Err(e);
        }
    };

    let mut builder = ProxyAuthResolver::builder(
        Arc::new(store),
        Arc::new(cipher),
        Arc::new(TerminalPrompt::new()),
    )
    .remember_scope(config.store.remember_scope)
    .with_event_callback(log_event);
    if let Some(timeout) = config.prompt_timeout() {
        info!("Prompts time out after {}s", timeout.as_secs());
        builder = builder.prompt_timeout(timeout);
    }
    let resolver = builder.build();

    // Create shutdown channel
    let (shutdown_tx, _) = broadcast::channel(1);

    // Set up signal handlers
    let mut signals = Signals::new([SIGTERM, SIGINT])?;
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        use futures::stream::StreamExt;
        while let Some(signal) = signals.next().await {
            match signal {
                SIGTERM => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    let _ = shutdown_tx_clone.send(());
                    break;
                }
                SIGINT => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    let _ = shutdown_tx_clone.send(());
                    break;
                }
                _ => {}
            }
        }
    });

    let server = Arc::new(Server::new(resolver, config.socket_path()?, shutdown_tx));

    info!("Daemon ready");

    server.run().await?;

    info!("Daemon shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Instant;

    use super::*;

    #[test]
    fn test_finish_does_not_wait_for_blocked_reads() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (_keep_open, blocked) = std::sync::mpsc::channel::<()>();
        let _reader = runtime.spawn_blocking(move || blocked.recv());

        let started = Instant::now();
        finish(runtime);
        assert!(started.elapsed() < SHUTDOWN_GRACE * 5);
    }
}
