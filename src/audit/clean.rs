//! Removal of transient content, orphans and, on request, backups.

use serde::Serialize;
use tracing::{info, warn};

use super::{Auditor, file_size, scan_bin};
use crate::backup::BackupChain;
use crate::core::Result;
use crate::transport::Remote;
use crate::utils::fs::{disk_usage, remove_dir_all_if_exists, remove_file_if_exists};

/// What `clean` may delete beyond transient content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanOptions {
    /// Delete the whole backup chain. Irreversible; callers set this only
    /// after explicit confirmation.
    pub backups_confirmed: bool,
}

/// Space released by one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Freed {
    pub bytes: u64,
    pub files: u64,
}

impl Freed {
    fn add(&mut self, bytes: u64) {
        self.bytes += bytes;
        self.files += 1;
    }
}

impl std::ops::Add for Freed {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            bytes: self.bytes + other.bytes,
            files: self.files + other.files,
        }
    }
}

/// Per-category result of [`Auditor::clean`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// `.cache/` contents
    pub cache: Freed,
    /// Staging files in `bin/`
    pub staging: Freed,
    /// Artifacts with no registry entry
    pub orphans: Freed,
    /// Names of removed orphans
    pub orphan_names: Vec<String>,
    /// Backup chain; `None` when not requested
    pub backups: Option<Freed>,
}

impl CleanReport {
    /// Sum over every category.
    #[must_use]
    pub fn total(&self) -> Freed {
        self.cache + self.staging + self.orphans + self.backups.unwrap_or_default()
    }
}

impl<R: Remote> Auditor<'_, R> {
    /// Delete cache and staging content and orphaned artifacts, and the
    /// backup chain when `options.backups_confirmed` is set.
    ///
    /// The registry is read before anything is deleted; if it cannot be
    /// parsed nothing is removed, since every artifact would look orphaned.
    /// Individual files that cannot be removed are logged and skipped.
    ///
    /// # Errors
    ///
    /// Fails if the registry cannot be read or `bin/` cannot be listed.
    pub async fn clean(&self, options: CleanOptions) -> Result<CleanReport> {
        let registry = self.load_registry().await?;
        let scan = scan_bin(self.layout, &registry).await?;
        let mut report = CleanReport::default();

        let cache = self.layout.cache_dir();
        let (bytes, files) = disk_usage(&cache);
        match remove_dir_all_if_exists(&cache).await {
            Ok(_) => report.cache = Freed { bytes, files },
            Err(e) => warn!("Failed to clear {}: {}", cache.display(), e),
        }

        for path in &scan.staging {
            let size = file_size(path);
            match remove_file_if_exists(path).await {
                Ok(true) => report.staging.add(size),
                Ok(false) => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        for (name, path) in &scan.orphans {
            let size = file_size(path);
            match remove_file_if_exists(path).await {
                Ok(true) => {
                    info!("Removed orphaned artifact {}", path.display());
                    report.orphans.add(size);
                    report.orphan_names.push(name.clone());
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        if options.backups_confirmed {
            let removed = BackupChain::new(self.layout).purge().await?;
            report.backups = Some(Freed {
                bytes: removed.bytes,
                files: removed.files,
            });
        }

        Ok(report)
    }
}
