//! The package lifecycle engine.
//!
//! [`LifecycleEngine`] owns every transition of the registry and the backup
//! chain. Each operation runs strictly in sequence and commits durable state
//! in one direction only:
//!
//! ```text
//! resolve catalog -> resolve release -> stage + verify -> [backup] -> rename -> registry
//! ```
//!
//! Anything that fails before the rename leaves the registry and the existing
//! artifact exactly as they were. The registry is always written last, so an
//! interrupted run can leave an artifact without an entry (an orphan) or an
//! entry whose artifact is gone, both of which the auditor reports, but never
//! a registry entry for bytes that were not verified.
//!
//! # Operations
//!
//! | Operation | Precondition | Effect |
//! |-----------|--------------|--------|
//! | [`install`](LifecycleEngine::install) | not installed | artifact + entry |
//! | [`update`](LifecycleEngine::update) | installed | backup old, replace, rewrite entry; no-op at same version |
//! | [`update_all`](LifecycleEngine::update_all) | - | `update` per entry, failures tallied |
//! | [`rollback`](LifecycleEngine::rollback) | has backups | back up current, restore target, rewrite entry |
//! | [`repair`](LifecycleEngine::repair) | installed | remove, reinstall the recorded version |
//! | [`uninstall`](LifecycleEngine::uninstall) | installed | remove artifact, backups, then entry |

pub mod batch;
pub mod events;
pub mod self_update;
pub mod snapshot;


use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backup::{Backup, BackupChain, RemovedBackups};
use crate::catalog::Catalog;
use crate::config::InstallLayout;
use crate::core::{CmamError, Result};
use crate::fetch::{FetchRequest, Verification, fetch_verify_replace, fetch_verify_stage};
use crate::registry::Registry;
use crate::release::{ResolvedArtifact, resolve_artifact};
use crate::transport::Remote;
use crate::utils::fs::remove_file_if_exists;
use crate::version::same_version;

pub use batch::{BatchItem, BatchOptions, BatchOutcome, BatchReport};
pub use events::{EventSink, LifecycleEvent, NullSink};
pub use self_update::{SelfUpdateOptions, SelfUpdateOutcome, SelfUpdater};
pub use snapshot::Snapshot;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Application name
    pub name: String,
    /// Installed version
    pub version: String,
    /// Whether the artifact was checked against a published checksum
    pub verification: Verification,
}

/// Result of a successful update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The artifact was replaced.
    Updated {
        /// Version before the update
        from: String,
        /// Version after the update
        to: String,
        /// Backup of the previous artifact, if one was made
        backup: Option<Backup>,
        /// Verification state of the new artifact
        verification: Verification,
    },
    /// Already at the resolved version; nothing changed.
    UpToDate {
        /// The installed version
        version: String,
    },
}

/// Result of a successful rollback call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// No version was requested; these are the available backups, newest first.
    Listed(Vec<Backup>),
    /// The artifact was restored from a backup.
    RolledBack {
        /// Version before the rollback, if the app was installed
        from: Option<String>,
        /// Version restored
        to: String,
    },
}

/// Result of a successful uninstall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallOutcome {
    /// Application name
    pub name: String,
    /// Version that was installed
    pub version: String,
    /// Whether an artifact was actually on disk
    pub artifact_removed: bool,
    /// Space freed from the backup chain, when backups were removed
    pub backups_removed: Option<RemovedBackups>,
}

/// Orchestrates lifecycle operations over one install root.
pub struct LifecycleEngine<R> {
    remote: R,
    layout: InstallLayout,
    backups: BackupChain,
    sink: Arc<dyn EventSink>,
}

impl<R> std::fmt::Debug for LifecycleEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine").field("layout", &self.layout).finish_non_exhaustive()
    }
}

impl<R: Remote> LifecycleEngine<R> {
    /// Engine for `layout` talking to `remote`, discarding events.
    pub fn new(remote: R, layout: InstallLayout) -> Self {
        let backups = BackupChain::new(&layout);
        Self {
            remote,
            layout,
            backups,
            sink: Arc::new(NullSink),
        }
    }

    /// Send events to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Install layout.
    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// Remote collaborators.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Backup chain.
    pub fn backups(&self) -> &BackupChain {
        &self.backups
    }

    /// Load the registry from disk.
    ///
    /// # Errors
    ///
    /// Fails if the registry exists but cannot be parsed.
    pub async fn load_registry(&self) -> Result<Registry> {
        Registry::load(&self.layout.registry_path()).await
    }

    /// Fetch the catalog.
    ///
    /// # Errors
    ///
    /// Catalog transport errors.
    pub async fn fetch_catalog(&self) -> Result<Catalog> {
        self.remote.fetch_catalog().await
    }

    fn emit(&self, event: LifecycleEvent) {
        self.sink.emit(event);
    }

    /// Install `name`, at `version` if given, otherwise at the latest release.
    ///
    /// # Errors
    ///
    /// - [`CmamError::AlreadyInstalled`] if the registry has an entry
    /// - not-found errors from catalog or release resolution
    /// - [`CmamError::VersionMismatch`] if a pinned release carries another version
    /// - transport and integrity errors from the download
    pub async fn install(&self, name: &str, version: Option<&str>) -> Result<InstallOutcome> {
        let registry = self.load_registry().await?;
        if let Some(existing) = registry.get(name) {
            return Err(CmamError::AlreadyInstalled {
                name: name.to_string(),
                version: existing.version.clone(),
            });
        }

        let catalog = self.fetch_catalog().await?;
        self.install_with(&catalog, registry, name, version).await
    }

    /// Install against an already fetched catalog and loaded registry.
    pub(crate) async fn install_with(
        &self,
        catalog: &Catalog,
        mut registry: Registry,
        name: &str,
        version: Option<&str>,
    ) -> Result<InstallOutcome> {
        let resolved = self.resolve(catalog, name, version).await?;
        self.layout.ensure_dirs().await?;

        let dest = self.layout.artifact_path(name);
        let verification = fetch_verify_replace(
            &self.remote,
            FetchRequest {
                app: name,
                url: &resolved.asset.download_url,
                expected_checksum: resolved.asset.expected_checksum.as_deref(),
                dest: &dest,
            },
            self.sink.as_ref(),
        )
        .await?;

        registry.record(name, &resolved.version);
        registry.save().await?;

        info!("Installed {} {}", name, resolved.version);
        self.emit(LifecycleEvent::Done {
            app: name.to_string(),
            version: resolved.version.clone(),
        });

        Ok(InstallOutcome {
            name: name.to_string(),
            version: resolved.version,
            verification,
        })
    }

    /// Update `name` to `version` if given, otherwise to the latest release.
    ///
    /// Already being at the resolved version is success with no side effects.
    /// When `keep_backup` is set the current artifact is saved under its
    /// current version after the new one has been verified and before it is
    /// committed.
    ///
    /// # Errors
    ///
    /// - [`CmamError::NotInstalled`] if there is no registry entry
    /// - everything [`install`](Self::install) can return except `AlreadyInstalled`
    pub async fn update(
        &self,
        name: &str,
        version: Option<&str>,
        keep_backup: bool,
    ) -> Result<UpdateOutcome> {
        let registry = self.load_registry().await?;
        let current = registry
            .version_of(name)
            .ok_or_else(|| CmamError::NotInstalled {
                name: name.to_string(),
            })?
            .to_string();

        let catalog = self.fetch_catalog().await?;
        let resolved = self.resolve(&catalog, name, version).await?;

        if same_version(&current, &resolved.version) {
            debug!("{} is already at {}", name, current);
            return Ok(UpdateOutcome::UpToDate { version: current });
        }

        self.apply_update(registry, name, &current, &resolved, keep_backup).await
    }

    /// Stage the resolved artifact, back up the current one, commit, record.
    pub(crate) async fn apply_update(
        &self,
        mut registry: Registry,
        name: &str,
        current: &str,
        resolved: &ResolvedArtifact,
        keep_backup: bool,
    ) -> Result<UpdateOutcome> {
        self.layout.ensure_dirs().await?;
        let dest = self.layout.artifact_path(name);

        let staged = fetch_verify_stage(
            &self.remote,
            FetchRequest {
                app: name,
                url: &resolved.asset.download_url,
                expected_checksum: resolved.asset.expected_checksum.as_deref(),
                dest: &dest,
            },
            self.sink.as_ref(),
        )
        .await?;

        let backup = if keep_backup {
            self.backup_current(name, current).await?
        } else {
            None
        };

        let verification = staged.verification();
        self.emit(LifecycleEvent::Committing {
            app: name.to_string(),
        });
        staged.commit()?;

        registry.record(name, &resolved.version);
        registry.save().await?;

        info!("Updated {} from {} to {}", name, current, resolved.version);
        self.emit(LifecycleEvent::Done {
            app: name.to_string(),
            version: resolved.version.clone(),
        });

        Ok(UpdateOutcome::Updated {
            from: current.to_string(),
            to: resolved.version.clone(),
            backup,
            verification,
        })
    }

    /// Back up the canonical artifact of `name` under `version`. Returns
    /// `None` without error when there is no artifact to back up.
    async fn backup_current(&self, name: &str, version: &str) -> Result<Option<Backup>> {
        let artifact = self.layout.artifact_path(name);
        if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            warn!("No artifact at {} to back up for {}", artifact.display(), name);
            return Ok(None);
        }

        self.emit(LifecycleEvent::BackingUp {
            app: name.to_string(),
            version: version.to_string(),
        });
        self.backups.create(name, version, &artifact).await.map(Some)
    }

    /// Roll `name` back to the backup at `version`, or list backups when no
    /// version is given.
    ///
    /// Before restoring, the current artifact is itself backed up under the
    /// current version, so every rollback can be undone with another one.
    /// An app with backups but no registry entry can be rolled back; the entry
    /// is created.
    ///
    /// # Errors
    ///
    /// - [`CmamError::NoBackupsAvailable`] if the chain holds nothing for `name`
    /// - [`CmamError::BackupNotFound`] if there is no backup at `version`
    pub async fn rollback(&self, name: &str, version: Option<&str>) -> Result<RollbackOutcome> {
        let available = self.backups.list(name).await?;
        if available.is_empty() {
            return Err(CmamError::NoBackupsAvailable {
                name: name.to_string(),
            });
        }

        let Some(requested) = version else {
            return Ok(RollbackOutcome::Listed(available));
        };

        let target = available
            .into_iter()
            .find(|backup| same_version(&backup.version, requested))
            .ok_or_else(|| CmamError::BackupNotFound {
                name: name.to_string(),
                version: requested.to_string(),
            })?;

        let mut registry = self.load_registry().await?;
        let current = registry.version_of(name).map(str::to_string);
        self.layout.ensure_dirs().await?;

        if let Some(current) = current.as_deref()
            && !same_version(current, &target.version)
        {
            self.backup_current(name, current).await?;
        }

        self.emit(LifecycleEvent::Restoring {
            app: name.to_string(),
            version: target.version.clone(),
        });
        self.backups.restore(&target, &self.layout.artifact_path(name)).await?;

        registry.record(name, &target.version);
        registry.save().await?;

        info!("Rolled back {} to {}", name, target.version);
        self.emit(LifecycleEvent::Done {
            app: name.to_string(),
            version: target.version.clone(),
        });

        Ok(RollbackOutcome::RolledBack {
            from: current,
            to: target.version,
        })
    }

    /// Reinstall `name` at its recorded version.
    ///
    /// The artifact and the registry entry are removed, then the recorded
    /// version is installed again. If the reinstall fails the app is left
    /// uninstalled and the error is returned.
    ///
    /// # Errors
    ///
    /// - [`CmamError::NotInstalled`] if there is no registry entry
    /// - anything [`install`](Self::install) can return
    pub async fn repair(&self, name: &str) -> Result<InstallOutcome> {
        let mut registry = self.load_registry().await?;
        let version = registry
            .version_of(name)
            .ok_or_else(|| CmamError::NotInstalled {
                name: name.to_string(),
            })?
            .to_string();

        let catalog = self.fetch_catalog().await?;

        debug!("Repairing {} at {}", name, version);
        self.emit(LifecycleEvent::Removing {
            app: name.to_string(),
        });
        remove_file_if_exists(&self.layout.artifact_path(name)).await?;
        registry.remove(name);
        registry.save().await?;

        match self.install_with(&catalog, registry, name, Some(&version)).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(
                    "Repair of {} failed after removal; reinstall with 'cmam install {} --version {}'",
                    name, name, version
                );
                Err(e)
            }
        }
    }

    /// Remove `name`: its artifact, its backups unless `keep_backups`, and
    /// finally its registry entry.
    ///
    /// A missing artifact or a failure to delete backups is logged and does
    /// not stop the uninstall.
    ///
    /// # Errors
    ///
    /// - [`CmamError::NotInstalled`] if there is no registry entry
    /// - filesystem errors removing the artifact or saving the registry
    pub async fn uninstall(&self, name: &str, keep_backups: bool) -> Result<UninstallOutcome> {
        let mut registry = self.load_registry().await?;
        let version = registry
            .version_of(name)
            .ok_or_else(|| CmamError::NotInstalled {
                name: name.to_string(),
            })?
            .to_string();

        self.emit(LifecycleEvent::Removing {
            app: name.to_string(),
        });

        let artifact = self.layout.artifact_path(name);
        let artifact_removed = remove_file_if_exists(&artifact).await?;
        if !artifact_removed {
            warn!("Artifact for {} was already missing at {}", name, artifact.display());
        }

        let backups_removed = if keep_backups {
            None
        } else {
            match self.backups.remove_all(name).await {
                Ok(removed) => Some(removed),
                Err(e) => {
                    warn!("Failed to remove backups of {}: {}", name, e);
                    None
                }
            }
        };

        registry.remove(name);
        registry.save().await?;

        info!("Uninstalled {} {}", name, version);
        self.emit(LifecycleEvent::Done {
            app: name.to_string(),
            version: version.clone(),
        });

        Ok(UninstallOutcome {
            name: name.to_string(),
            version,
            artifact_removed,
            backups_removed,
        })
    }

    /// Backups of `name`, newest first.
    ///
    /// # Errors
    ///
    /// Fails if the backup directory cannot be read.
    pub async fn list_backups(&self, name: &str) -> Result<Vec<Backup>> {
        self.backups.list(name).await
    }

    /// Resolve catalog entry and release for `name`, enforcing that a pinned
    /// request gets the version it asked for.
    pub(crate) async fn resolve(
        &self,
        catalog: &Catalog,
        name: &str,
        version: Option<&str>,
    ) -> Result<ResolvedArtifact> {
        self.emit(LifecycleEvent::Resolving {
            app: name.to_string(),
        });
        let entry = catalog.resolve(name)?;
        let resolved =
            resolve_artifact(&self.remote, &entry.source_locator, version, self.layout.suffix())
                .await?;

        resolved.ensure_pinned(name, version)?;

        self.emit(LifecycleEvent::Resolved {
            app: name.to_string(),
            version: resolved.version.clone(),
        });
        Ok(resolved)
    }
}
