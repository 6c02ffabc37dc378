//! Configuration types for the proxyauth daemon.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/proxyauth/config.toml`.
//! Every key is optional; a missing file yields the defaults.
//!
//! ## Example Configuration
//!
//! ```toml
//! [store]
//! path = "/var/lib/proxyauth/credentials.json"
//! key_file = "/var/lib/proxyauth/master.key"
//! remember_scope = "machine"
//!
//! [prompt]
//! timeout_secs = 120
//!
//! [server]
//! socket_path = "/run/user/1000/proxyauth.sock"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use proxyauth::RememberScope;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, Result};
use crate::paths;

/// Default credential file name under the data directory.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Default master key file name under the data directory.
pub const KEY_FILE: &str = "master.key";

/// Default socket file name under the data directory.
pub const SOCKET_FILE: &str = "proxyauth.sock";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Persistent credential storage
    #[serde(default)]
    pub store: StoreSettings,

    /// Interactive prompt behavior
    #[serde(default)]
    pub prompt: PromptSettings,

    /// Client socket
    #[serde(default)]
    pub server: ServerSettings,
}

/// Persistent store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Credential file location
    pub path: Option<PathBuf>,

    /// Master key location
    pub key_file: Option<PathBuf>,

    /// Scope recorded with remembered credentials
    #[serde(default)]
    pub remember_scope: RememberScope,
}

/// Prompt settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSettings {
    /// Seconds to wait for an answer before giving up (unbounded if unset)
    pub timeout_secs: Option<u64>,
}

/// Server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Unix socket location
    pub socket_path: Option<PathBuf>,
}

impl DaemonConfig {
    /// Loads configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined
    /// - The file exists but cannot be read or parsed
    /// - Validation fails
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Loads configuration from `path`, falling back to defaults if it is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        paths::config_dir()
            .map(|dir| dir.join("config.toml"))
            .ok_or_else(|| DaemonError::Config("Failed to determine config directory".to_string()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `prompt.timeout_secs` is zero
    /// - Any configured path is empty
    pub fn validate(&self) -> Result<()> {
        if self.prompt.timeout_secs == Some(0) {
            return Err(DaemonError::Config(
                "prompt.timeout_secs must be greater than zero".to_string(),
            ));
        }

        let configured = [
            ("store.path", &self.store.path),
            ("store.key_file", &self.store.key_file),
            ("server.socket_path", &self.server.socket_path),
        ];
        for (name, path) in configured {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(DaemonError::Config(format!("{name} must not be empty")));
            }
        }

        Ok(())
    }

    /// Returns the prompt timeout, if one is configured.
    #[must_use]
    pub fn prompt_timeout(&self) -> Option<Duration> {
        self.prompt.timeout_secs.map(Duration::from_secs)
    }

    /// Returns the credential file path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the data directory cannot be determined.
    pub fn store_path(&self) -> Result<PathBuf> {
        Self::or_data_file(self.store.path.as_ref(), CREDENTIALS_FILE)
    }

    /// Returns the master key path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the data directory cannot be determined.
    pub fn key_file_path(&self) -> Result<PathBuf> {
        Self::or_data_file(self.store.key_file.as_ref(), KEY_FILE)
    }

    /// Returns the Unix socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the data directory cannot be determined.
    pub fn socket_path(&self) -> Result<PathBuf> {
        Self::or_data_file(self.server.socket_path.as_ref(), SOCKET_FILE)
    }

    fn or_data_file(configured: Option<&PathBuf>, name: &str) -> Result<PathBuf> {
        if let Some(path) = configured {
            return Ok(path.clone());
        }
        paths::data_dir()
            .map(|dir| dir.join(name))
            .ok_or_else(|| DaemonError::Config("Failed to determine data directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;

    fn sample_config_toml() -> &'static str {
        r#"
[store]
path = "/tmp/proxyauth/credentials.json"
key_file = "/tmp/proxyauth/master.key"
remember_scope = "machine"

[prompt]
timeout_secs = 90

[server]
socket_path = "/tmp/proxyauth/proxyauth.sock"
        "#
    }

    #[test]
    fn test_parse_config() {
        let config: DaemonConfig = toml::from_str(sample_config_toml()).unwrap();

        assert_eq!(config.store.remember_scope, RememberScope::Machine);
        assert_eq!(config.prompt_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/tmp/proxyauth/credentials.json")
        );
        assert_eq!(
            config.key_file_path().unwrap(),
            PathBuf::from("/tmp/proxyauth/master.key")
        );
        assert_eq!(
            config.socket_path().unwrap(),
            PathBuf::from("/tmp/proxyauth/proxyauth.sock")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();

        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.store.remember_scope, RememberScope::User);
        assert_eq!(config.prompt_timeout(), None);
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config: DaemonConfig = toml::from_str("[prompt]\ntimeout_secs = 0\n").unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn test_validate_empty_path() {
        let config: DaemonConfig = toml::from_str("[server]\nsocket_path = \"\"\n").unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.socket_path"));
    }

    #[test]
    fn test_unknown_scope_is_rejected() {
        let result: std::result::Result<DaemonConfig, _> =
            toml::from_str("[store]\nremember_scope = \"galaxy\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, sample_config_toml()).unwrap();

        let config = DaemonConfig::load_from(&path).unwrap();
        assert_eq!(config.prompt.timeout_secs, Some(90));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[prompt]\ntimeout_secs = 0\n").unwrap();

        assert!(matches!(
            DaemonConfig::load_from(&path),
            Err(DaemonError::Config(_))
        ));
    }
}
