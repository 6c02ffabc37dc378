//! # proxyauth-daemon
//!
//! Long-running process that answers proxy authentication challenges for
//! local clients over a Unix domain socket.
//!
//! The daemon wires the [`proxyauth`] resolver to concrete collaborators:
//!
//! - [`storage::FileCredentialStore`]: remembered credentials in an
//!   owner-only JSON file
//! - [`cipher::AesGcmCipher`]: AES-256-GCM with a generated master key
//! - [`prompt::TerminalPrompt`]: asks on the daemon's terminal
//! - [`server::Server`]: line-delimited JSON over a Unix socket

pub mod cipher;
pub mod config;
pub mod error;
pub mod paths;
pub mod prompt;
pub mod server;
pub mod storage;

pub use error::{DaemonError, Result};
