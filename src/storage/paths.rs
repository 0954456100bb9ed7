//! Application paths for config and cache storage.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application paths.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
    /// Cache directory (default home of the persistent key-value store).
    pub cache: PathBuf,
}

impl AppPaths {
    /// Create paths for the ledgerlink client.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("io", "ledgerlink", "ledgerlink") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
                cache: proj_dirs.cache_dir().to_path_buf(),
            }
        } else {
            // Fallback to home directory
            let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
            Self {
                config: home.join(".config/ledgerlink"),
                cache: home.join(".cache/ledgerlink"),
            }
        }
    }

    /// Path to the client config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Directory holding the persistent key-value store (one file per key).
    #[must_use]
    pub fn store_dir(&self) -> PathBuf {
        self.cache.join("store")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_dir_is_under_cache() {
        let paths = AppPaths::new();
        assert!(paths.store_dir().starts_with(&paths.cache));
    }

    #[test]
    fn config_file_is_toml() {
        let paths = AppPaths::new();
        assert_eq!(
            paths.config_file().extension().and_then(|e| e.to_str()),
            Some("toml")
        );
    }
}
