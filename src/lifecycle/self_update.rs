//! Updating the CMAM binary itself.
//!
//! Self-update is the same fetch-verify-replace sequence the lifecycle
//! engine uses for apps, aimed at the running executable and resolved from
//! the manager's own repository. The checksum gate applies unchanged.
//!
//! On Windows a running executable cannot be replaced but can be renamed,
//! so the current binary is moved aside to `<exe>.old` right before the
//! staged one is committed, and moved back if the commit fails.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::events::{EventSink, LifecycleEvent};
use crate::constants::MANAGER_BINARY_NAME;
use crate::core::Result;
use crate::fetch::{FetchRequest, Verification, fetch_verify_stage};
use crate::release::resolve_artifact;
use crate::transport::{ArtifactTransport, ReleaseTransport};
use crate::version::{Version, same_version};

/// What the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfUpdateOptions {
    /// Install this version instead of the latest.
    pub target_version: Option<String>,
    /// Only report whether an update is available.
    pub check_only: bool,
    /// Reinstall even when already up to date.
    pub force: bool,
}

/// Result of a self-update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpdateOutcome {
    /// Nothing to do.
    UpToDate { current: String },
    /// `check_only` was set and a different version is available.
    Available { current: String, latest: String },
    /// The binary was replaced.
    Updated {
        from: String,
        to: String,
        verification: Verification,
    },
}

/// Replaces the running CMAM executable with a published release.
#[derive(Debug, Clone)]
pub struct SelfUpdater {
    repository: String,
    suffix: String,
    executable: PathBuf,
    current_version: String,
}

impl SelfUpdater {
    /// Updater for `executable`, currently at `current_version`, pulling
    /// releases of `repository`.
    pub fn new(
        repository: impl Into<String>,
        suffix: impl Into<String>,
        executable: impl Into<PathBuf>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            suffix: suffix.into(),
            executable: executable.into(),
            current_version: current_version.into(),
        }
    }

    /// Updater for the running process at this crate's version.
    ///
    /// # Errors
    ///
    /// Fails if the current executable path cannot be determined.
    pub fn for_current_exe(repository: impl Into<String>, suffix: impl Into<String>) -> Result<Self> {
        let executable = std::env::current_exe()?;
        Ok(Self::new(repository, suffix, executable, env!("CARGO_PKG_VERSION")))
    }

    /// Version of the running binary.
    #[must_use]
    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Path being replaced.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Run the update.
    ///
    /// # Errors
    ///
    /// Release resolution, transport, integrity and filesystem errors, and
    /// [`CmamError::VersionMismatch`](crate::core::CmamError::VersionMismatch)
    /// when a pinned release carries another version. The running binary is
    /// untouched unless the new one verified.
    pub async fn run<T>(
        &self,
        transport: &T,
        options: &SelfUpdateOptions,
        sink: &dyn EventSink,
    ) -> Result<SelfUpdateOutcome>
    where
        T: ReleaseTransport + ArtifactTransport + ?Sized,
    {
        debug!("Checking {} for CMAM releases", self.repository);
        sink.emit(LifecycleEvent::Resolving {
            app: MANAGER_BINARY_NAME.to_string(),
        });
        let resolved = resolve_artifact(
            transport,
            &self.repository,
            options.target_version.as_deref(),
            &self.suffix,
        )
        .await?;
        resolved.ensure_pinned(MANAGER_BINARY_NAME, options.target_version.as_deref())?;

        let wanted = self.wants(&resolved.version, options);
        if !wanted {
            return Ok(SelfUpdateOutcome::UpToDate {
                current: self.current_version.clone(),
            });
        }
        if options.check_only {
            return Ok(SelfUpdateOutcome::Available {
                current: self.current_version.clone(),
                latest: resolved.version,
            });
        }

        sink.emit(LifecycleEvent::Resolved {
            app: MANAGER_BINARY_NAME.to_string(),
            version: resolved.version.clone(),
        });

        let staged = fetch_verify_stage(
            transport,
            FetchRequest {
                app: MANAGER_BINARY_NAME,
                url: &resolved.asset.download_url,
                expected_checksum: resolved.asset.expected_checksum.as_deref(),
                dest: &self.executable,
            },
            sink,
        )
        .await?;
        let verification = staged.verification();

        sink.emit(LifecycleEvent::Committing {
            app: MANAGER_BINARY_NAME.to_string(),
        });
        self.commit(staged)?;

        info!("Updated CMAM from {} to {}", self.current_version, resolved.version);
        sink.emit(LifecycleEvent::Done {
            app: MANAGER_BINARY_NAME.to_string(),
            version: resolved.version.clone(),
        });

        Ok(SelfUpdateOutcome::Updated {
            from: self.current_version.clone(),
            to: resolved.version,
            verification,
        })
    }

    /// Whether `candidate` should be installed over the running version.
    fn wants(&self, candidate: &str, options: &SelfUpdateOptions) -> bool {
        if options.force {
            return true;
        }
        if same_version(&self.current_version, candidate) {
            return false;
        }
        if options.target_version.is_some() {
            return true;
        }
        match (Version::parse(&self.current_version), Version::parse(candidate)) {
            (Ok(current), Ok(latest)) => latest > current,
            _ => true,
        }
    }

    #[cfg(windows)]
    fn commit(&self, staged: crate::fetch::StagedArtifact) -> Result<()> {
        use crate::constants::MANAGER_ASIDE_EXTENSION;
        use crate::core::CmamError;

        let aside = self.executable.with_extension(MANAGER_ASIDE_EXTENSION);
        let _ = std::fs::remove_file(&aside);
        let moved = match std::fs::rename(&self.executable, &aside) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(CmamError::fs("move aside", &self.executable, e)),
        };

        if let Err(e) = staged.commit() {
            if moved && let Err(restore) = std::fs::rename(&aside, &self.executable) {
                warn!("Failed to restore {}: {}", self.executable.display(), restore);
            }
            return Err(e);
        }
        Ok(())
    }

    #[cfg(not(windows))]
    fn commit(&self, staged: crate::fetch::StagedArtifact) -> Result<()> {
        staged.commit().map(|_| ()).inspect_err(|e| {
            warn!("Failed to replace {}: {}", self.executable.display(), e);
        })
    }
}
