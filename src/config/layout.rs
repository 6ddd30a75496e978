//! On-disk layout of an install root.
//!
//! ```text
//! <root>/
//! ├── config.toml
//! ├── registry.toml
//! ├── bin/
//! │   ├── <app><suffix>             canonical artifacts
//! │   ├── cmam.old                  replaced manager binary (Windows)
//! │   └── .<app>.<random>.part      staging files (transient)
//! ├── backups/<app>/<version>/<app><suffix>
//! └── .cache/
//! ```

use std::path::{Path, PathBuf};

use crate::constants::{
    CONFIG_FILE_NAME, MANAGER_ASIDE_EXTENSION, MANAGER_BINARY_NAME, REGISTRY_FILE_NAME,
    STAGING_SUFFIX,
};
use crate::core::{CmamError, Result};

/// Paths derived from an install root and the artifact suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
    suffix: String,
}

impl InstallLayout {
    /// Layout rooted at `root` using `suffix` for artifact file names.
    pub fn new(root: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            suffix: suffix.into(),
        }
    }

    /// Platform default root: `C:\.cmam` on Windows, `~/.cmam` elsewhere.
    ///
    /// # Errors
    ///
    /// Fails when the home directory cannot be determined.
    pub fn default_root() -> Result<PathBuf> {
        if cfg!(windows) {
            return Ok(PathBuf::from(r"C:\.cmam"));
        }
        dirs::home_dir().map(|home| home.join(".cmam")).ok_or_else(|| CmamError::Config {
            message: "unable to determine home directory; set CMAM_ROOT or pass --root".into(),
        })
    }

    /// The install root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact file suffix (e.g. `.exe`).
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// `<root>/config.toml`
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    /// `<root>/registry.toml`
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE_NAME)
    }

    /// `<root>/bin`, the directory that belongs on PATH.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// `<root>/backups`
    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// `<root>/.cache`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(".cache")
    }

    /// Artifact file name for `app`.
    #[must_use]
    pub fn artifact_file_name(&self, app: &str) -> String {
        format!("{app}{}", self.suffix)
    }

    /// Canonical artifact path `bin/<app><suffix>`.
    #[must_use]
    pub fn artifact_path(&self, app: &str) -> PathBuf {
        self.bin_dir().join(self.artifact_file_name(app))
    }

    /// Prefix shared by every staging file of `app`.
    #[must_use]
    pub fn staging_prefix(app: &str) -> String {
        format!(".{app}.")
    }

    /// Whether a file name in `bin/` is a staging file.
    #[must_use]
    pub fn is_staging_file(file_name: &str) -> bool {
        file_name.starts_with('.') && file_name.ends_with(STAGING_SUFFIX)
    }

    /// Map an artifact file name in `bin/` back to its app name.
    ///
    /// Returns `None` for staging files and files without the artifact suffix.
    #[must_use]
    pub fn app_name_for(&self, file_name: &str) -> Option<String> {
        if Self::is_staging_file(file_name) {
            return None;
        }
        let name = if self.suffix.is_empty() {
            file_name
        } else {
            file_name.strip_suffix(self.suffix.as_str())?
        };
        (!name.is_empty()).then(|| name.to_string())
    }

    /// File name of the manager binary itself, which shares `bin/`.
    #[must_use]
    pub fn manager_file_name(&self) -> String {
        self.artifact_file_name(MANAGER_BINARY_NAME)
    }

    /// Name the previous manager binary is left under after a Windows
    /// self-update.
    #[must_use]
    pub fn manager_aside_file_name() -> String {
        format!("{MANAGER_BINARY_NAME}.{MANAGER_ASIDE_EXTENSION}")
    }

    /// Create `bin/`, `backups/` and `.cache/` under the root.
    ///
    /// # Errors
    ///
    /// Fails if any directory cannot be created.
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.bin_dir(), self.backups_dir(), self.cache_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| CmamError::fs("create directory", &dir, e))?;
        }
        Ok(())
    }
}

/// Pick the install root: explicit flag, then `CMAM_ROOT`, then the
/// configured `install_root`, then the platform default.
///
/// # Errors
///
/// Fails only when falling back to the platform default and no home
/// directory is available.
pub fn resolve_root(
    flag: Option<&Path>,
    env_value: Option<&str>,
    configured: Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(flag) = flag {
        return Ok(flag.to_path_buf());
    }
    if let Some(env_value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Ok(super::global::expand_path(env_value));
    }
    if let Some(configured) = configured {
        return Ok(configured);
    }
    InstallLayout::default_root()
}
