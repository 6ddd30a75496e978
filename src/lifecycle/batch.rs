//! Batch operations: `update --all` and `import`.
//!
//! A batch processes apps one at a time in registry (or snapshot) order. A
//! failing app is recorded in the [`BatchReport`] and, with
//! `skip_on_error`, the batch carries on with the next one. Without it the
//! batch stops at the first failure and the remaining apps are reported as
//! [`BatchOutcome::NotAttempted`]. An unreachable catalog fails every app
//! that needed it, each with the catalog error. Only an unreadable registry
//! is returned as an error.

use std::cmp::Ordering;

use tracing::{info, warn};

use super::{LifecycleEngine, Snapshot, UpdateOutcome};
use crate::core::{CmamError, ErrorKind, Result};
use crate::registry::Registry;
use crate::release::ResolvedArtifact;
use crate::transport::Remote;
use crate::version::{Version, same_version};

/// Knobs for batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Continue past a failing app.
    pub skip_on_error: bool,
    /// Back up artifacts before replacing them.
    pub keep_backups: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            skip_on_error: true,
            keep_backups: true,
        }
    }
}

/// What happened to one app in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Installed fresh (import only).
    Installed { version: String },
    /// Replaced with another version.
    Updated { from: String, to: String },
    /// Already at the wanted version.
    UpToDate { version: String },
    /// The operation failed for this app.
    Failed { kind: ErrorKind, message: String },
    /// Not processed because an earlier app failed.
    NotAttempted,
}

impl BatchOutcome {
    fn failed(error: &CmamError) -> Self {
        Self::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Whether this outcome counts as a failure.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether this outcome changed anything on disk.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Installed { .. } | Self::Updated { .. })
    }
}

/// One app's line in a batch report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Application name
    pub name: String,
    /// What happened
    pub outcome: BatchOutcome,
}

/// Per-app tally of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Items in processing order
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    fn push(&mut self, name: &str, outcome: BatchOutcome) {
        self.items.push(BatchItem {
            name: name.to_string(),
            outcome,
        });
    }

    /// Items that installed or updated something.
    pub fn changed(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| item.outcome.is_change())
    }

    /// Items that failed.
    pub fn failed(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| item.outcome.is_failure())
    }

    /// Number of successful items, including those already up to date.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| !item.outcome.is_failure() && item.outcome != BatchOutcome::NotAttempted)
            .count()
    }

    /// Number of failed items.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    /// Whether any item failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

/// Whether `latest` should replace `current` in `update --all`.
///
/// Both parse: strictly newer only. Otherwise any difference counts.
fn is_newer(current: &str, latest: &str) -> bool {
    match (Version::parse(current), Version::parse(latest)) {
        (Ok(current), Ok(latest)) => latest.cmp(&current) == Ordering::Greater,
        _ => !same_version(current, latest),
    }
}

/// Whether `registry` already records `name` at `version`.
fn is_installed_at(registry: &Registry, name: &str, version: &str) -> bool {
    registry.version_of(name).is_some_and(|v| same_version(v, version))
}

impl<R: Remote> LifecycleEngine<R> {
    /// Update every installed app to its latest release if that is newer.
    ///
    /// If the catalog cannot be fetched every app is reported failed with
    /// that error.
    ///
    /// # Errors
    ///
    /// Only when the registry cannot be read. Per-app failures are in the
    /// report.
    pub async fn update_all(&self, options: BatchOptions) -> Result<BatchReport> {
        let registry = self.load_registry().await?;
        let mut report = BatchReport::default();
        if registry.is_empty() {
            return Ok(report);
        }

        let catalog = self
            .fetch_catalog()
            .await
            .inspect_err(|e| warn!("Catalog unavailable, no app can be updated: {}", e));
        let mut stopped = false;

        for (name, current) in registry.versions() {
            if stopped {
                report.push(&name, BatchOutcome::NotAttempted);
                continue;
            }

            let result = match &catalog {
                Ok(catalog) => self.update_if_newer(catalog, &name, &current, options).await,
                Err(e) => {
                    stopped = !options.skip_on_error;
                    report.push(&name, BatchOutcome::failed(e));
                    continue;
                }
            };
            let outcome = result.unwrap_or_else(|e| {
                warn!("Update of {} failed: {}", name, e);
                stopped = !options.skip_on_error;
                BatchOutcome::failed(&e)
            });
            report.push(&name, outcome);
        }

        info!(
            "Batch update finished: {} succeeded, {} failed",
            report.success_count(),
            report.failure_count()
        );
        Ok(report)
    }

    async fn update_if_newer(
        &self,
        catalog: &crate::catalog::Catalog,
        name: &str,
        current: &str,
        options: BatchOptions,
    ) -> Result<BatchOutcome> {
        let resolved: ResolvedArtifact = self.resolve(catalog, name, None).await?;
        if !is_newer(current, &resolved.version) {
            return Ok(BatchOutcome::UpToDate {
                version: current.to_string(),
            });
        }

        // Reload so each app commits on top of the previous app's write.
        let registry = self.load_registry().await?;
        match self.apply_update(registry, name, current, &resolved, options.keep_backups).await? {
            UpdateOutcome::Updated { from, to, .. } => Ok(BatchOutcome::Updated { from, to }),
            UpdateOutcome::UpToDate { version } => Ok(BatchOutcome::UpToDate { version }),
        }
    }

    /// Bring the registry in line with `snapshot`: install missing apps and
    /// move installed ones to the recorded version.
    ///
    /// Apps already at the recorded version are reported up to date and left
    /// alone. Apps installed locally but absent from the snapshot are not
    /// touched. If the catalog cannot be fetched every app that needed it is
    /// reported failed with that error.
    ///
    /// # Errors
    ///
    /// Only when the registry cannot be read. Per-app failures are in the
    /// report.
    pub async fn import(&self, snapshot: &Snapshot, options: BatchOptions) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        if snapshot.packages.is_empty() {
            return Ok(report);
        }

        let initial = self.load_registry().await?;
        let needs_network = snapshot
            .packages
            .iter()
            .any(|(name, version)| !is_installed_at(&initial, name, version));
        let catalog = if needs_network {
            let fetched = self.fetch_catalog().await;
            if let Err(e) = &fetched {
                warn!("Catalog unavailable, only apps already at their version can be matched: {}", e);
            }
            Some(fetched)
        } else {
            None
        };

        let mut stopped = false;
        for (name, version) in &snapshot.packages {
            if stopped {
                report.push(name, BatchOutcome::NotAttempted);
                continue;
            }

            let outcome = match &catalog {
                Some(Ok(catalog)) => self.import_one(catalog, name, version, options).await,
                Some(Err(e)) if !is_installed_at(&initial, name, version) => {
                    stopped = !options.skip_on_error;
                    report.push(name, BatchOutcome::failed(e));
                    continue;
                }
                _ => Ok(BatchOutcome::UpToDate {
                    version: version.clone(),
                }),
            };
            let outcome = outcome.unwrap_or_else(|e| {
                warn!("Import of {} {} failed: {}", name, version, e);
                stopped = !options.skip_on_error;
                BatchOutcome::failed(&e)
            });
            report.push(name, outcome);
        }

        Ok(report)
    }

    async fn import_one(
        &self,
        catalog: &crate::catalog::Catalog,
        name: &str,
        version: &str,
        options: BatchOptions,
    ) -> Result<BatchOutcome> {
        let registry = self.load_registry().await?;
        match registry.version_of(name).map(str::to_string) {
            Some(current) if same_version(&current, version) => {
                Ok(BatchOutcome::UpToDate { version: current })
            }
            Some(current) => {
                let resolved = self.resolve(catalog, name, Some(version)).await?;
                match self
                    .apply_update(registry, name, &current, &resolved, options.keep_backups)
                    .await?
                {
                    UpdateOutcome::Updated { from, to, .. } => Ok(BatchOutcome::Updated { from, to }),
                    UpdateOutcome::UpToDate { version } => Ok(BatchOutcome::UpToDate { version }),
                }
            }
            None => {
                let outcome = self.install_with(catalog, registry, name, Some(version)).await?;
                Ok(BatchOutcome::Installed {
                    version: outcome.version,
                })
            }
        }
    }
}
