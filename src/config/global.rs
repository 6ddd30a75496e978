//! Global configuration for CMAM.
//!
//! The configuration file lives at `<root>/config.toml`. Every key is
//! optional; a missing file yields the defaults, while a file that exists but
//! cannot be parsed is a [`CmamError::Config`] so a typo never silently
//! reverts the user to the public catalog.
//!
//! ```toml
//! catalog_url = "https://api.github.com/repos/cmerk2021/cmam/contents/packages.json"
//! api_base_url = "https://api.github.com"
//! self_repository = "cmerk2021/cmam"
//! artifact_suffix = ".exe"
//! # install_root = "~/tools/cmam"
//!
//! [lifecycle]
//! keep_backups = true
//! skip_on_error = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_ARTIFACT_SUFFIX, DEFAULT_CATALOG_URL, DEFAULT_SELF_REPOSITORY,
};
use crate::core::{CmamError, Result};
use crate::utils::fs::atomic_write;

fn default_catalog_url() -> String {
    DEFAULT_CATALOG_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_self_repository() -> String {
    DEFAULT_SELF_REPOSITORY.to_string()
}

fn default_artifact_suffix() -> String {
    DEFAULT_ARTIFACT_SUFFIX.to_string()
}

const fn default_true() -> bool {
    true
}

/// Lifecycle defaults applied when the CLI does not override them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Back up the current artifact before `update` replaces it.
    #[serde(default = "default_true")]
    pub keep_backups: bool,

    /// Continue `update --all` past a failing app.
    #[serde(default = "default_true")]
    pub skip_on_error: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            keep_backups: true,
            skip_on_error: true,
        }
    }
}

/// User configuration stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Where the app catalog is fetched from.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// REST API base for release lookups.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// `owner/repo` publishing CMAM itself, used by `self-update`.
    #[serde(default = "default_self_repository")]
    pub self_repository: String,

    /// File suffix that identifies the installable asset of a release.
    #[serde(default = "default_artifact_suffix")]
    pub artifact_suffix: String,

    /// Install root override. `--root` and `CMAM_ROOT` take precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_root: Option<String>,

    /// Lifecycle defaults.
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            api_base_url: default_api_base_url(),
            self_repository: default_self_repository(),
            artifact_suffix: default_artifact_suffix(),
            install_root: None,
            lifecycle: LifecycleConfig::default(),
        }
    }
}

/// Keys accepted by `cmam config set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "catalog_url",
    "api_base_url",
    "self_repository",
    "artifact_suffix",
    "install_root",
    "lifecycle.keep_backups",
    "lifecycle.skip_on_error",
];

impl GlobalConfig {
    /// Load from `path`, returning defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`CmamError::Config`] if the file exists but is not valid TOML
    /// for this schema, or a filesystem error if it cannot be read.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).await.map_err(|e| CmamError::fs("read", path, e))?;

        toml::from_str(&content).map_err(|e| CmamError::Config {
            message: format!("{}: {}", path.display(), e.message()),
        })
    }

    /// Write the configuration to `path` atomically.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CmamError::Config {
            message: format!("failed to serialize configuration: {e}"),
        })?;
        atomic_write(path, content.as_bytes()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .map_err(|e| CmamError::fs("read permissions of", path, e))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)
                .await
                .map_err(|e| CmamError::fs("set permissions on", path, e))?;
        }

        Ok(())
    }

    /// Set a single key from its string form.
    ///
    /// An empty value for `install_root` clears the override.
    ///
    /// # Errors
    ///
    /// Returns [`CmamError::Config`] for unknown keys or unparsable values.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parse_bool = |value: &str| -> Result<bool> {
            value.parse::<bool>().map_err(|_| CmamError::Config {
                message: format!("'{key}' expects true or false, got '{value}'"),
            })
        };

        match key {
            "catalog_url" => self.catalog_url = value.to_string(),
            "api_base_url" => self.api_base_url = value.trim_end_matches('/').to_string(),
            "self_repository" => self.self_repository = value.to_string(),
            "artifact_suffix" => self.artifact_suffix = value.to_string(),
            "install_root" => {
                self.install_root = (!value.is_empty()).then(|| value.to_string());
            }
            "lifecycle.keep_backups" => self.lifecycle.keep_backups = parse_bool(value)?,
            "lifecycle.skip_on_error" => self.lifecycle.skip_on_error = parse_bool(value)?,
            _ => {
                return Err(CmamError::Config {
                    message: format!(
                        "unknown key '{key}' (expected one of: {})",
                        SETTABLE_KEYS.join(", ")
                    ),
                });
            }
        }
        Ok(())
    }

    /// The configured install root with `~` and environment variables expanded.
    #[must_use]
    pub fn expanded_install_root(&self) -> Option<PathBuf> {
        self.install_root.as_deref().map(expand_path)
    }
}

/// Expand `~` and `$VAR` in a user-supplied path. Unexpandable input is
/// returned as written.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}
