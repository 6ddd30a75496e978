//! Portable registry snapshots for `export` and `import`.
//!
//! ```json
//! {
//!   "exported_at": "2025-01-01T12:00:00Z",
//!   "packages": { "foo": "1.0.0", "bar": "2.1.0-beta" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{CmamError, Result};
use crate::registry::Registry;
use crate::utils::fs::atomic_write;

/// A `name -> version` snapshot of the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the snapshot was taken
    pub exported_at: DateTime<Utc>,
    /// Installed versions by app name
    pub packages: BTreeMap<String, String>,
}

impl Snapshot {
    /// Snapshot of `registry` taken now.
    #[must_use]
    pub fn of(registry: &Registry) -> Self {
        Self {
            exported_at: Utc::now(),
            packages: registry.versions(),
        }
    }

    /// Pretty JSON form.
    ///
    /// # Errors
    ///
    /// Serialization failure.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CmamError::Other {
            message: format!("failed to serialize snapshot: {e}"),
        })
    }

    /// Parse a snapshot.
    ///
    /// # Errors
    ///
    /// [`CmamError::Config`] when the JSON does not match the format.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| CmamError::Config {
            message: format!("invalid snapshot: {e}"),
        })
    }

    /// Read a snapshot file.
    ///
    /// # Errors
    ///
    /// Read or parse failure.
    pub async fn read(path: &Path) -> Result<Self> {
        let content =
            tokio::fs::read_to_string(path).await.map_err(|e| CmamError::fs("read", path, e))?;
        Self::from_json(&content)
    }

    /// Write the snapshot to `path` atomically.
    ///
    /// # Errors
    ///
    /// Serialization or write failure.
    pub async fn write(&self, path: &Path) -> Result<()> {
        atomic_write(path, self.to_json()?.as_bytes()).await
    }
}
