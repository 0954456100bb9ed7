//! Client configuration.
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. Environment variables
//! 2. Config file (`config.toml` in the platform config directory)
//! 3. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `LEDGERLINK_BASE_URL`: Base URL of the ledger service
//! - `LEDGERLINK_TIMEOUT`: Request timeout in seconds
//! - `LEDGERLINK_STORAGE_DIR`: Directory for the persistent key-value store

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};
use crate::storage::AppPaths;

/// Environment variable for the service base URL.
pub const ENV_BASE_URL: &str = "LEDGERLINK_BASE_URL";
/// Environment variable for the request timeout in seconds.
pub const ENV_TIMEOUT: &str = "LEDGERLINK_TIMEOUT";
/// Environment variable for the persistent store directory.
pub const ENV_STORAGE_DIR: &str = "LEDGERLINK_STORAGE_DIR";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Config file shape
// =============================================================================

/// Raw config file contents. Every field optional; missing values fall back
/// to defaults at resolution time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct FileConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    storage_dir: Option<PathBuf>,
    storage_quota_bytes: Option<u64>,
}

// =============================================================================
// Resolved configuration
// =============================================================================

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the ledger service.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Directory for the persistent key-value store. `None` selects the
    /// platform cache directory; an unusable directory degrades to the
    /// no-op store at client construction.
    pub storage_dir: Option<PathBuf>,
    /// Byte budget for the persistent store, if bounded.
    pub storage_quota_bytes: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("ledgerlink/{}", env!("CARGO_PKG_VERSION")),
            storage_dir: None,
            storage_quota_bytes: None,
        }
    }
}

impl ClientConfig {
    /// Config with a base URL and defaults for everything else.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the persistent store directory.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Bound the persistent store to a byte budget.
    #[must_use]
    pub const fn with_storage_quota(mut self, bytes: u64) -> Self {
        self.storage_quota_bytes = Some(bytes);
        self
    }

    /// Load configuration from the default config file location, then apply
    /// environment overrides. A missing file is not an error.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let paths = AppPaths::new();
        Self::load_from(&paths.config_file())
    }

    /// Load configuration from a specific file, then apply environment
    /// overrides.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str::<FileConfig>(&content)
                .map_err(|e| ApiError::Config(format!("{}: {e}", path.display())))?
        } else {
            FileConfig::default()
        };

        let mut config = Self::default();
        if let Some(base_url) = file.base_url {
            config.base_url = base_url;
        }
        if let Some(secs) = file.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        config.storage_dir = file.storage_dir;
        config.storage_quota_bytes = file.storage_quota_bytes;

        config.apply_env();
        Ok(config)
    }

    /// Apply environment variable overrides in place.
    fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url;
            }
        }
        if let Ok(timeout) = std::env::var(ENV_TIMEOUT) {
            if let Ok(secs) = timeout.trim().parse::<u64>() {
                self.timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(dir) = std::env::var(ENV_STORAGE_DIR) {
            if !dir.trim().is_empty() {
                self.storage_dir = Some(PathBuf::from(dir));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sane() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.storage_dir.is_none());
        assert!(config.user_agent.starts_with("ledgerlink/"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = ClientConfig::load_from(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.base_url, ClientConfig::default().base_url);
    }

    #[test]
    fn file_values_override_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "base-url = \"https://ledger.example.com\"\ntimeout-secs = 5\nstorage-quota-bytes = 1024\n",
        )
        .unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.base_url, "https://ledger.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.storage_quota_bytes, Some(1024));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "base-url = [not toml").unwrap();

        assert!(ClientConfig::load_from(&path).is_err());
    }

    #[test]
    fn builder_setters_apply() {
        let config = ClientConfig::new("https://api.example.com")
            .with_timeout(Duration::from_secs(3))
            .with_storage_dir("/tmp/ll")
            .with_storage_quota(2048);
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.storage_dir.as_deref(), Some(Path::new("/tmp/ll")));
        assert_eq!(config.storage_quota_bytes, Some(2048));
    }
}
