// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem document store.
//!
//! This module provides a store that serves documents from a directory tree.
//! Each subdirectory of the root is a reference (a branch or version), and
//! documents live underneath it:
//!
//! ```text
//! <root>/main/billing.yml
//! <root>/main/billing-prod.yml
//! <root>/v2/billing-prod.yml
//! <root>/feature/tls/billing.yml     reference "feature/tls"
//! ```

use crate::domain::{ConfigError, Result};
use crate::ports::DocumentStore;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Maximum allowed document size (10MB).
/// Larger files are refused rather than read into memory.
pub const MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024;

/// How deep nested references such as `feature/tls` may go.
const MAX_REFERENCE_DEPTH: usize = 4;

/// Document store backed by a local directory tree.
///
/// The store never writes to the tree. Paths and references are checked so
/// a request cannot escape the root, including through symlinks.
///
/// # Examples
///
/// ```rust,no_run
/// use cfgserver::adapters::FileSystemStore;
/// use cfgserver::ports::DocumentStore;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FileSystemStore::new("/srv/config-repo")?;
/// let bytes = store.read("billing-prod.yml", "main").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Creates a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Settings` if the root does not exist or is not a
    /// directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| ConfigError::Settings {
            message: format!("Invalid or inaccessible store root: {}", root.display()),
            source: Some(Box::new(e)),
        })?;
        if !canonical.is_dir() {
            return Err(ConfigError::Settings {
                message: format!("Store root is not a directory: {}", root.display()),
                source: None,
            });
        }
        Ok(Self { root: canonical })
    }

    /// The canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `reference/path` under the root, or `None` if either part
    /// is not a plain relative path.
    fn resolve(&self, path: &str, reference: &str) -> Option<PathBuf> {
        if !is_plain_relative(reference) || !is_plain_relative(path) {
            return None;
        }
        Some(self.root.join(reference).join(path))
    }

    /// Walks the directory tree breadth-first and returns every reference.
    async fn collect_references(&self) -> io::Result<Vec<String>> {
        let mut references = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new(), 0usize)];

        while let Some((dir, prefix, depth)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                if !entry.file_type().await?.is_dir() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let reference = if prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", prefix, name)
                };
                if depth + 1 < MAX_REFERENCE_DEPTH {
                    pending.push((entry.path(), reference.clone(), depth + 1));
                }
                references.push(reference);
            }
        }

        references.sort();
        Ok(references)
    }
}

/// Accepts `a/b/c.yml`; rejects empty, absolute, `.` and `..` segments.
fn is_plain_relative(value: &str) -> bool {
    if value.is_empty() || value.contains('\\') {
        return false;
    }
    Path::new(value)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        && !value.split('/').any(|segment| segment.is_empty() || segment == ".")
}

#[async_trait]
impl DocumentStore for FileSystemStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn read(&self, path: &str, reference: &str) -> io::Result<Option<Vec<u8>>> {
        let Some(candidate) = self.resolve(path, reference) else {
            warn!(path, reference, "Rejected document path outside the store root");
            return Ok(None);
        };

        let canonical = match tokio::fs::canonicalize(&candidate).await {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %candidate.display(), "Document not present");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !canonical.starts_with(&self.root) {
            warn!(path, reference, "Document resolves outside the store root");
            return Ok(None);
        }

        let metadata = tokio::fs::metadata(&canonical).await?;
        if !metadata.is_file() {
            return Ok(None);
        }
        if metadata.len() > MAX_DOCUMENT_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Configuration file too large: {} bytes (max {} bytes)",
                    metadata.len(),
                    MAX_DOCUMENT_SIZE
                ),
            ));
        }

        match tokio::fs::read(&canonical).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// References are directories, so every reference is listed whatever the
    /// path.
    async fn list_versions(&self, _path: &str) -> io::Result<Vec<String>> {
        self.collect_references().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_with(files: &[(&str, &str)]) -> (TempDir, FileSystemStore) {
        let dir = TempDir::new().unwrap();
        for (path, content) in files {
            let full = dir.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let store = FileSystemStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_file_store_read() {
        let (_dir, store) = store_with(&[("main/billing.yml", "a: 1")]);
        let bytes = store.read("billing.yml", "main").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(b"a: 1".as_slice()));
    }

    #[tokio::test]
    async fn test_file_store_missing_document() {
        let (_dir, store) = store_with(&[("main/billing.yml", "a: 1")]);
        assert!(store.read("other.yml", "main").await.unwrap().is_none());
        assert!(store.read("billing.yml", "v9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_nested_path_and_reference() {
        let (_dir, store) = store_with(&[("feature/tls/config/billing.yml", "tls: true")]);
        let bytes = store.read("config/billing.yml", "feature/tls").await.unwrap();
        assert!(bytes.is_some());
    }

    #[tokio::test]
    async fn test_file_store_rejects_traversal() {
        let (dir, store) = store_with(&[("main/billing.yml", "a: 1")]);
        fs::write(dir.path().join("secret.yml"), "password: x").unwrap();

        assert!(store.read("../secret.yml", "main").await.unwrap().is_none());
        assert!(store.read("secret.yml", "..").await.unwrap().is_none());
        assert!(store.read("/etc/passwd", "main").await.unwrap().is_none());
        assert!(store.read("a//b.yml", "main").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("leak.yml"), "x: 1").unwrap();
        let (dir, store) = store_with(&[("main/billing.yml", "a: 1")]);
        std::os::unix::fs::symlink(
            outside.path().join("leak.yml"),
            dir.path().join("main/leak.yml"),
        )
        .unwrap();

        assert!(store.read("leak.yml", "main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_directory_is_not_a_document() {
        let (_dir, store) = store_with(&[("main/sub/billing.yml", "a: 1")]);
        assert!(store.read("sub", "main").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_list_versions() {
        let (_dir, store) = store_with(&[
            ("main/a.yml", ""),
            ("v2/a.yml", ""),
            ("feature/tls/a.yml", ""),
            (".git/HEAD", ""),
        ]);
        let versions = store.list_versions("a.yml").await.unwrap();
        assert_eq!(versions, vec!["feature", "feature/tls", "main", "v2"]);
    }

    #[test]
    fn test_file_store_invalid_root() {
        let result = FileSystemStore::new("/nonexistent/path/to/repo");
        assert!(matches!(result, Err(ConfigError::Settings { .. })));
    }

    #[test]
    fn test_is_plain_relative() {
        assert!(is_plain_relative("billing.yml"));
        assert!(is_plain_relative("config/billing.yml"));
        assert!(!is_plain_relative(""));
        assert!(!is_plain_relative("./billing.yml"));
        assert!(!is_plain_relative("a/../b"));
        assert!(!is_plain_relative("a\\b"));
    }
}
