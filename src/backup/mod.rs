//! Per-application, per-version backups of installed artifacts.
//!
//! Backups live at `backups/<app>/<version>/<app><suffix>`. At most one backup
//! exists per `(app, version)`; creating another for the same pair replaces
//! it. Listing is sorted newest first by [`Version`](crate::version::Version)
//! order, not lexically.
//!
//! The chain is a passive store: it never decides *when* to back up or
//! restore. The lifecycle engine sequences those calls.
//!
//! Copies into and out of the chain are staged beside their destination and
//! renamed into place, so neither a backup nor a restored artifact is ever
//! observed half-written.

use std::path::{Path, PathBuf};

use tempfile::Builder;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::InstallLayout;
use crate::constants::{BACKUP_RESTORE_ATTEMPTS, BACKUP_RESTORE_RETRY_DELAY, STAGING_SUFFIX};
use crate::core::{CmamError, Result};
use crate::utils::fs::{check_path_component, disk_usage, remove_dir_all_if_exists};
use crate::version::{same_version, sort_newest_first};

/// A stored copy of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Application name
    pub app: String,
    /// Version the artifact had when it was backed up
    pub version: String,
    /// Location of the stored artifact
    pub path: PathBuf,
}

/// Space released by removing backups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovedBackups {
    /// Bytes freed
    pub bytes: u64,
    /// Files removed
    pub files: u64,
}

/// The backup store under `<root>/backups`.
#[derive(Debug, Clone)]
pub struct BackupChain {
    dir: PathBuf,
    suffix: String,
}

impl BackupChain {
    /// Backup chain for `layout`.
    #[must_use]
    pub fn new(layout: &InstallLayout) -> Self {
        Self {
            dir: layout.backups_dir(),
            suffix: layout.suffix().to_string(),
        }
    }

    /// Root directory of the chain.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn app_dir(&self, app: &str) -> PathBuf {
        self.dir.join(app)
    }

    fn backup_path(&self, app: &str, version: &str) -> PathBuf {
        self.app_dir(app).join(version).join(format!("{app}{}", self.suffix))
    }

    /// Copy `source` into the chain as the backup of `app` at `version`.
    ///
    /// # Errors
    ///
    /// Fails if `app` or `version` cannot be used as a directory name, or if
    /// the copy fails. On failure any previous backup of the same pair is
    /// left intact.
    pub async fn create(&self, app: &str, version: &str, source: &Path) -> Result<Backup> {
        check_path_component("application name", app)?;
        check_path_component("version", version)?;

        let dest = self.backup_path(app, version);
        let parent = dest.parent().map(Path::to_path_buf).unwrap_or_else(|| self.dir.clone());
        fs::create_dir_all(&parent).await.map_err(|e| CmamError::fs("create directory", &parent, e))?;

        debug!("Backing up {} {} from {}", app, version, source.display());
        copy_staged(source, &dest, app).await?;

        info!("Created backup of {} at version {}", app, version);
        Ok(Backup {
            app: app.to_string(),
            version: version.to_string(),
            path: dest,
        })
    }

    /// Backups of `app`, newest first. Version directories without an
    /// artifact inside are skipped.
    ///
    /// # Errors
    ///
    /// Fails if the app's backup directory exists but cannot be read.
    pub async fn list(&self, app: &str) -> Result<Vec<Backup>> {
        let app_dir = self.app_dir(app);
        let mut entries = match fs::read_dir(&app_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CmamError::fs("read directory", &app_dir, e)),
        };

        let mut versions = Vec::new();
        while let Some(entry) =
            entries.next_entry().await.map_err(|e| CmamError::fs("read directory", &app_dir, e))?
        {
            let Ok(version) = entry.file_name().into_string() else {
                continue;
            };
            if fs::try_exists(self.backup_path(app, &version)).await.unwrap_or(false) {
                versions.push(version);
            }
        }

        sort_newest_first(&mut versions);
        Ok(versions
            .into_iter()
            .map(|version| Backup {
                app: app.to_string(),
                path: self.backup_path(app, &version),
                version,
            })
            .collect())
    }

    /// The backup of `app` at `version`, matching `v1.0.0` and `1.0.0` alike.
    ///
    /// # Errors
    ///
    /// Fails if listing fails.
    pub async fn find(&self, app: &str, version: &str) -> Result<Option<Backup>> {
        Ok(self.list(app).await?.into_iter().find(|backup| same_version(&backup.version, version)))
    }

    /// Applications that have at least one backup directory.
    ///
    /// # Errors
    ///
    /// Fails if the chain directory exists but cannot be read.
    pub async fn apps(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CmamError::fs("read directory", &self.dir, e)),
        };

        let mut apps = Vec::new();
        while let Some(entry) =
            entries.next_entry().await.map_err(|e| CmamError::fs("read directory", &self.dir, e))?
        {
            if entry.file_type().await.is_ok_and(|t| t.is_dir())
                && let Ok(name) = entry.file_name().into_string()
            {
                apps.push(name);
            }
        }
        apps.sort();
        Ok(apps)
    }

    /// Copy `backup` over `dest`.
    ///
    /// The artifact is staged in `dest`'s directory and renamed into place.
    /// Transient failures (a busy executable on Windows) are retried a few
    /// times before giving up.
    ///
    /// # Errors
    ///
    /// Fails if the backup is gone or every attempt fails.
    pub async fn restore(&self, backup: &Backup, dest: &Path) -> Result<()> {
        if !fs::try_exists(&backup.path).await.unwrap_or(false) {
            return Err(CmamError::BackupNotFound {
                name: backup.app.clone(),
                version: backup.version.clone(),
            });
        }

        let mut attempt = 1;
        loop {
            match copy_staged(&backup.path, dest, &backup.app).await {
                Ok(()) => {
                    info!("Restored {} {} to {}", backup.app, backup.version, dest.display());
                    return Ok(());
                }
                Err(e) if attempt < BACKUP_RESTORE_ATTEMPTS => {
                    warn!("Restore attempt {} failed: {}. Retrying...", attempt, e);
                    tokio::time::sleep(BACKUP_RESTORE_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Delete every backup of `app`.
    ///
    /// # Errors
    ///
    /// Fails if the directory exists but cannot be removed.
    pub async fn remove_all(&self, app: &str) -> Result<RemovedBackups> {
        let app_dir = self.app_dir(app);
        let (bytes, files) = disk_usage(&app_dir);
        remove_dir_all_if_exists(&app_dir).await?;
        Ok(RemovedBackups { bytes, files })
    }

    /// Delete every backup. The chain directory itself is kept, empty.
    ///
    /// # Errors
    ///
    /// Fails if the chain directory cannot be emptied or recreated.
    pub async fn purge(&self) -> Result<RemovedBackups> {
        let (bytes, files) = disk_usage(&self.dir);
        remove_dir_all_if_exists(&self.dir).await?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CmamError::fs("create directory", &self.dir, e))?;
        Ok(RemovedBackups { bytes, files })
    }
}

/// Copy `source` to a staging file next to `dest`, then rename it over `dest`.
///
/// Unix permissions of `source` are carried over.
pub(crate) async fn copy_staged(source: &Path, dest: &Path, app: &str) -> Result<()> {
    let parent = dest.parent().ok_or_else(|| CmamError::Other {
        message: format!("{} has no parent directory", dest.display()),
    })?;

    let staging = Builder::new()
        .prefix(&InstallLayout::staging_prefix(app))
        .suffix(STAGING_SUFFIX)
        .tempfile_in(parent)
        .map_err(|e| CmamError::fs("create staging file in", parent, e))?;

    fs::copy(source, staging.path()).await.map_err(|e| CmamError::fs("copy", source, e))?;

    #[cfg(unix)]
    {
        let permissions = fs::metadata(source)
            .await
            .map_err(|e| CmamError::fs("read metadata of", source, e))?
            .permissions();
        fs::set_permissions(staging.path(), permissions)
            .await
            .map_err(|e| CmamError::fs("set permissions on", staging.path(), e))?;
    }

    staging.persist(dest).map_err(|e| CmamError::fs("replace", dest, e.error))?;
    Ok(())
}
