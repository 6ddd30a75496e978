//! Local registry of installed applications.
//!
//! The registry is the single source of truth for "what is installed": a
//! mapping from application name to the version whose artifact is expected at
//! `bin/<app><suffix>`. It is a passive store. Every mutation is sequenced by
//! the lifecycle engine, which writes the registry only after the filesystem
//! change it records has been committed.
//!
//! # Format
//!
//! ```toml
//! [packages.foo]
//! version = "1.0.0"
//! installed_at = "2025-01-01T12:00:00Z"
//! ```
//!
//! Entries are kept in a `BTreeMap`, so the file is written in name order and
//! iteration (which drives `update --all`) is deterministic. Saving goes
//! through [`atomic_write`], so a reader never sees a half-written registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CmamError, Result};
use crate::utils::fs::atomic_write;

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// Installed version as recorded at commit time.
    pub version: String,

    /// When the entry was last written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

impl InstalledPackage {
    /// Entry for `version` stamped with the current time.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            installed_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    packages: BTreeMap<String, InstalledPackage>,
}

/// In-memory view of `registry.toml`, bound to its path.
#[derive(Debug, Clone)]
pub struct Registry {
    path: PathBuf,
    packages: BTreeMap<String, InstalledPackage>,
}

impl Registry {
    /// Empty registry that will be saved to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            packages: BTreeMap::new(),
        }
    }

    /// Load the registry at `path`.
    ///
    /// A missing or blank file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`CmamError::RegistryParse`] when the file exists but is not a
    /// valid registry, or a filesystem error when it cannot be read.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No registry at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => return Err(CmamError::fs("read", path, e)),
        };

        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::empty(path));
        }

        let file: RegistryFile = toml::from_str(content).map_err(|e| CmamError::RegistryParse {
            path: path.display().to_string(),
            reason: e.message().to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            packages: file.packages,
        })
    }

    /// Persist the registry atomically.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the atomic write fails.
    pub async fn save(&self) -> Result<()> {
        let file = RegistryFile {
            packages: self.packages.clone(),
        };
        let content = toml::to_string_pretty(&file).map_err(|e| CmamError::Other {
            message: format!("failed to serialize registry: {e}"),
        })?;
        atomic_write(&self.path, content.as_bytes()).await?;
        debug!("Saved registry with {} entries to {}", self.packages.len(), self.path.display());
        Ok(())
    }

    /// Path the registry is saved to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InstalledPackage> {
        self.packages.get(name)
    }

    /// Installed version of `name`.
    #[must_use]
    pub fn version_of(&self, name: &str) -> Option<&str> {
        self.packages.get(name).map(|p| p.version.as_str())
    }

    /// Whether `name` has an entry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// Record `name` at `version`, replacing any previous entry.
    pub fn record(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.packages.insert(name.into(), InstalledPackage::new(version));
    }

    /// Remove the entry for `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<InstalledPackage> {
        self.packages.remove(name)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstalledPackage)> {
        self.packages.iter().map(|(name, package)| (name.as_str(), package))
    }

    /// Names in name order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    /// `name -> version` snapshot.
    #[must_use]
    pub fn versions(&self) -> BTreeMap<String, String> {
        self.packages.iter().map(|(name, package)| (name.clone(), package.version.clone())).collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_and_blank_files_are_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.toml");

        let registry = Registry::load(&path).await.unwrap();
        assert!(registry.is_empty());

        tokio::fs::write(&path, "\n  \n").await.unwrap();
        assert!(Registry::load(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read_reproduces_mapping() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.toml");

        let mut registry = Registry::empty(&path);
        registry.record("zeta", "2.0.0-rc");
        registry.record("alpha", "1.0.0");
        registry.save().await.unwrap();

        let loaded = Registry::load(&path).await.unwrap();
        assert_eq!(loaded.versions(), registry.versions());
        assert_eq!(loaded.names(), vec!["alpha", "zeta"]);
        assert_eq!(loaded.get("alpha"), registry.get("alpha"));
    }

    #[tokio::test]
    async fn test_entries_without_timestamp_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.toml");
        tokio::fs::write(&path, "[packages.foo]\nversion = \"1.0.0\"\n").await.unwrap();

        let registry = Registry::load(&path).await.unwrap();
        assert_eq!(registry.version_of("foo"), Some("1.0.0"));
        assert!(registry.get("foo").unwrap().installed_at.is_none());
    }

    #[tokio::test]
    async fn test_malformed_registry_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("registry.toml");
        tokio::fs::write(&path, "[packages.foo]\nversion = 3\n").await.unwrap();

        let err = Registry::load(&path).await.unwrap_err();
        assert!(matches!(err, CmamError::RegistryParse { .. }));
        assert_eq!(err.kind(), crate::core::ErrorKind::Config);
    }

    #[test]
    fn test_record_and_remove() {
        let mut registry = Registry::empty("/tmp/registry.toml");
        registry.record("foo", "1.0.0");
        registry.record("foo", "1.1.0");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.version_of("foo"), Some("1.1.0"));

        assert_eq!(registry.remove("foo").map(|p| p.version), Some("1.1.0".to_string()));
        assert!(!registry.contains("foo"));
        assert!(registry.remove("foo").is_none());
    }
}
