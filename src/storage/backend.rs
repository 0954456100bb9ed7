//! Persistent key-value storage backends.
//!
//! The rest of the subsystem talks to storage only through the
//! [`StorageBackend`] capability trait, selected once at startup:
//!
//! - [`FileBackend`]: real persistence, one JSON file per key, atomic
//!   temp-file + rename writes, optional byte quota.
//! - [`NoopBackend`]: for hosts that grant no storage; reads miss, writes
//!   vanish, nothing errors.
//!
//! Higher layers never know which implementation is active.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors a storage backend can report.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The write would exceed the store's capacity.
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// Underlying I/O failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Capability interface over a persistent key-value store.
///
/// Keys are flat strings (`transactions`, `auth.access`, ...). Values are
/// opaque to the backend; the cache layer serializes JSON into them.
pub trait StorageBackend: Send + Sync {
    /// Read the value for a key. Missing or unreadable entries are `None`.
    fn read(&self, key: &str) -> Option<String>;

    /// Write the value for a key.
    ///
    /// # Errors
    /// Returns [`StorageError::QuotaExceeded`] when the store is full and
    /// [`StorageError::Io`] on other failures.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Whether values written here survive a process restart.
    fn is_persistent(&self) -> bool;
}

// =============================================================================
// File backend
// =============================================================================

/// File-per-key store with an optional byte quota.
///
/// Host storage quotas are not portably observable from a filesystem, so the
/// quota is an explicit byte budget over the sum of all stored values; a
/// write that would push past it fails with `QuotaExceeded` and leaves the
/// previous value intact.
pub struct FileBackend {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileBackend {
    /// Open (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>, quota_bytes: Option<u64>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, quota_bytes })
    }

    /// Path of the file holding a key's value.
    fn key_path(&self, key: &str) -> PathBuf {
        // Keys are internal identifiers; only the path separator needs
        // neutralizing.
        let safe: String = key
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Total bytes currently stored, excluding the named key.
    fn used_bytes_excluding(&self, key: &str) -> u64 {
        let skip = self.key_path(key);
        std::fs::read_dir(&self.dir)
            .ok()
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .filter(|e| e.path() != skip)
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.key_path(key)).ok()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            let incoming = value.len() as u64;
            if self.used_bytes_excluding(key) + incoming > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        write_atomic(&self.key_path(key), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let path = self.key_path(key);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(key, error = %e, "failed to remove stored key");
            }
        }
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

/// Write bytes atomically using temp file + rename.
/// This prevents corruption if the process is interrupted during write.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Create temp file in same directory (required for atomic rename)
    let parent = path.parent().unwrap_or(Path::new("."));
    let temp_path = parent.join(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("key"),
        std::process::id()
    ));

    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

// =============================================================================
// No-op backend
// =============================================================================

/// Backend for hosts without persistent storage. Reads always miss, writes
/// are silently dropped; callers observe an always-empty store that never
/// errors.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBackend;

impl StorageBackend for NoopBackend {
    fn read(&self, _key: &str) -> Option<String> {
        None
    }

    fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Ok(())
    }

    fn remove(&self, _key: &str) {}

    fn is_persistent(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_backend_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::open(tmp.path(), None).unwrap();

        assert!(backend.read("transactions").is_none());
        backend.write("transactions", r#"{"items":[]}"#).unwrap();
        assert_eq!(
            backend.read("transactions").as_deref(),
            Some(r#"{"items":[]}"#)
        );

        backend.remove("transactions");
        assert!(backend.read("transactions").is_none());
    }

    #[test]
    fn file_backend_overwrite_replaces_value() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::open(tmp.path(), None).unwrap();

        backend.write("k", "one").unwrap();
        backend.write("k", "two").unwrap();
        assert_eq!(backend.read("k").as_deref(), Some("two"));
    }

    #[test]
    fn file_backend_atomic_write_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::open(tmp.path(), None).unwrap();

        backend.write("k", "value").unwrap();

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn file_backend_enforces_quota() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::open(tmp.path(), Some(16)).unwrap();

        backend.write("small", "12345678").unwrap();
        let err = backend
            .write("big", "0123456789abcdef0")
            .expect_err("write past quota should fail");
        assert!(matches!(err, StorageError::QuotaExceeded));

        // Quota accounts for replacement: rewriting the same key at the same
        // size still fits.
        backend.write("small", "87654321").unwrap();
    }

    #[test]
    fn file_backend_quota_failure_keeps_previous_value() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::open(tmp.path(), Some(8)).unwrap();

        backend.write("k", "old").unwrap();
        assert!(backend.write("k", "waytoolongforthequota").is_err());
        assert_eq!(backend.read("k").as_deref(), Some("old"));
    }

    #[test]
    fn file_backend_sanitizes_path_separators() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::open(tmp.path(), None).unwrap();

        backend.write("../escape", "v").unwrap();
        assert_eq!(backend.read("../escape").as_deref(), Some("v"));
        // The written file stays inside the store directory.
        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn noop_backend_always_misses_and_never_errors() {
        let backend = NoopBackend;
        backend.write("k", "v").unwrap();
        assert!(backend.read("k").is_none());
        backend.remove("k");
        assert!(!backend.is_persistent());
    }
}
