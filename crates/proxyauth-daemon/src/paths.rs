//! XDG-compliant path helpers.
//!
//! Respects `XDG_CONFIG_HOME` and `XDG_DATA_HOME` environment
//! variables, falling back to `~/.config` and `~/.local/share`.

use std::path::PathBuf;

/// Directory name used under the XDG base directories.
pub const APP_DIR: &str = "proxyauth";

/// Returns `$XDG_CONFIG_HOME/proxyauth`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|base| base.join(APP_DIR))
}

/// Returns `$XDG_DATA_HOME/proxyauth`.
///
/// Holds the credential file, the master key and the daemon socket.
pub fn data_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .map(|base| base.join(APP_DIR))
}
