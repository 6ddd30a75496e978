//! Consistency auditing: registry vs. filesystem vs. remote.
//!
//! The registry and the `bin/` directory can drift apart (an interrupted
//! uninstall, a hand-deleted file, a killed download). The auditor never
//! trusts either side; it reports what it finds:
//!
//! - [`Auditor::validate`] and [`Auditor::trust`] compare each installed
//!   artifact with the checksum published for its recorded version
//! - [`Auditor::doctor`] runs every health check and sorts findings into
//!   issues and warnings
//! - [`Auditor::clean`] removes transient content, orphans and, on request,
//!   the backup chain

pub mod clean;
pub mod doctor;
pub mod validate;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::InstallLayout;
use crate::core::{CmamError, Result};
use crate::lifecycle::LifecycleEngine;
use crate::registry::Registry;
use crate::transport::Remote;

pub use clean::{CleanOptions, CleanReport, Freed};
pub use doctor::{CheckResult, CheckStatus, DoctorOptions, DoctorReport, Health};
pub use validate::{
    AppTrust, AppValidation, InvalidReason, TrustLevel, UnknownReason, ValidationReport,
    ValidationStatus,
};

/// Read-only view over an install root and its remote, plus `clean`.
pub struct Auditor<'a, R> {
    remote: &'a R,
    layout: &'a InstallLayout,
}

impl<'a, R: Remote> Auditor<'a, R> {
    /// Auditor for `layout` checking against `remote`.
    pub const fn new(remote: &'a R, layout: &'a InstallLayout) -> Self {
        Self { remote, layout }
    }

    /// Install layout under audit.
    pub const fn layout(&self) -> &InstallLayout {
        self.layout
    }

    async fn load_registry(&self) -> Result<Registry> {
        Registry::load(&self.layout.registry_path()).await
    }
}

impl<R: Remote> LifecycleEngine<R> {
    /// Auditor sharing this engine's remote and layout.
    pub fn auditor(&self) -> Auditor<'_, R> {
        Auditor::new(self.remote(), self.layout())
    }
}

/// What lives in `bin/` besides registered artifacts.
#[derive(Debug, Default)]
pub(crate) struct BinScan {
    /// Artifacts with no registry entry, by app name.
    pub orphans: Vec<(String, PathBuf)>,
    /// Leftover staging files and the manager binary moved aside by a
    /// Windows self-update.
    pub staging: Vec<PathBuf>,
}

/// Walk `bin/` and classify everything that is not a registered artifact.
///
/// The manager's own binary is never an orphan. A missing `bin/` is empty.
pub(crate) async fn scan_bin(layout: &InstallLayout, registry: &Registry) -> Result<BinScan> {
    let bin = layout.bin_dir();
    let mut scan = BinScan::default();
    let mut entries = match tokio::fs::read_dir(&bin).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(scan),
        Err(e) => return Err(CmamError::fs("read directory", &bin, e)),
    };

    let manager = layout.manager_file_name();
    let manager_aside = InstallLayout::manager_aside_file_name();
    while let Some(entry) =
        entries.next_entry().await.map_err(|e| CmamError::fs("read directory", &bin, e))?
    {
        if !entry.file_type().await.is_ok_and(|t| t.is_file()) {
            continue;
        }
        let Ok(file_name) = entry.file_name().into_string() else {
            continue;
        };

        if InstallLayout::is_staging_file(&file_name) || file_name == manager_aside {
            scan.staging.push(entry.path());
        } else if file_name != manager
            && let Some(app) = layout.app_name_for(&file_name)
            && !registry.contains(&app)
        {
            debug!("Orphaned artifact {}", entry.path().display());
            scan.orphans.push((app, entry.path()));
        }
    }

    scan.orphans.sort();
    scan.staging.sort();
    Ok(scan)
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
