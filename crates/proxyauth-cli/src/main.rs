//! Proxyauth CLI - submit a proxy challenge to the daemon
//!
//! Sends one challenge over the daemon socket and reports the outcome. The
//! exit status tells scripts whether credentials came back.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use proxyauth_common::{Attempt, AuthChallenge, ReplyOutcome};
use proxyauth_daemon::config::DaemonConfig;

mod client;

use crate::client::DaemonClient;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Proxy host name
    #[arg(long)]
    host: String,

    /// Proxy port
    #[arg(long)]
    port: u16,

    /// Proxy URL scheme
    #[arg(long, default_value = "http")]
    scheme: String,

    /// Retry counter: 1 for a first challenge, 2 after a rejection
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    attempt: u8,

    /// Mark the challenge as coming from the origin server instead of a proxy
    #[arg(long)]
    origin: bool,

    /// Daemon socket (defaults to the daemon's configured socket)
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Print the raw JSON reply
    #[arg(long)]
    json: bool,
}

/// Exit status for each reply outcome.
fn exit_code(outcome: &ReplyOutcome) -> u8 {
    match outcome {
        ReplyOutcome::Credentials { .. } => 0,
        ReplyOutcome::NoCredentials => 1,
        ReplyOutcome::NotHandled => 2,
        ReplyOutcome::Error { .. } => 3,
    }
}

fn print_outcome(outcome: &ReplyOutcome, challenge: &AuthChallenge) {
    let proxy = format!("{}://{}:{}", challenge.scheme, challenge.host, challenge.port);
    match outcome {
        ReplyOutcome::Credentials { username, .. } => {
            println!("{} {} as {}", "✓".green(), proxy, username.bold());
        }
        ReplyOutcome::NoCredentials => {
            println!("{} {}: no credentials", "✗".red(), proxy);
        }
        ReplyOutcome::NotHandled => {
            println!("{} {}: not a proxy challenge", "-".yellow(), proxy);
        }
        ReplyOutcome::Error { message } => {
            eprintln!("{} {}", "Error:".red().bold(), message);
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let socket_path = match args.socket {
        Some(path) => path,
        None => DaemonConfig::load()
            .and_then(|config| config.socket_path())
            .context("Failed to determine daemon socket path")?,
    };

    let attempt = Attempt::try_from(args.attempt)?;
    let challenge = AuthChallenge::builder()
        .scheme(args.scheme)
        .host(args.host)
        .port(args.port)
        .is_proxy(!args.origin)
        .attempt(attempt)
        .build();

    let mut client = DaemonClient::connect(&socket_path).await?;
    let raw = client.resolve(challenge.clone()).await?;
    log::debug!("Reply: {:?}", raw.reply.id);

    if args.json {
        println!("{}", raw.line);
    } else {
        print_outcome(&raw.reply.outcome, &challenge);
    }

    Ok(exit_code(&raw.reply.outcome))
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::from(3)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["proxyauth-cli", "--host", "proxy.corp", "--port", "3128"])
            .unwrap();

        assert_eq!(args.scheme, "http");
        assert_eq!(args.attempt, 1);
        assert!(!args.origin);
        assert!(args.socket.is_none());
    }

    #[test]
    fn test_attempt_out_of_range() {
        let result = Args::try_parse_from([
            "proxyauth-cli",
            "--host",
            "proxy.corp",
            "--port",
            "3128",
            "--attempt",
            "3",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_exit_codes() {
        let creds = ReplyOutcome::Credentials {
            username: "alice".to_string(),
            password: "secret".to_string(),
        };
        assert_eq!(exit_code(&creds), 0);
        assert_eq!(exit_code(&ReplyOutcome::NoCredentials), 1);
        assert_eq!(exit_code(&ReplyOutcome::NotHandled), 2);
        assert_eq!(
            exit_code(&ReplyOutcome::Error {
                message: "bad".to_string()
            }),
            3
        );
    }
}
