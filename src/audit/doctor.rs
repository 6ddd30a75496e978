//! Aggregate health check of an install root.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::{Auditor, scan_bin};
use crate::constants::MIN_FREE_SPACE_BYTES;
use crate::platform::PathRegistrar;
use crate::registry::Registry;
use crate::transport::Remote;
use crate::utils::fs::format_bytes;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    /// Worth fixing, but nothing is broken.
    Warning,
    /// Something is broken.
    Fail,
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    /// Check name, e.g. `registry` or `disk space`
    pub check: String,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    fn new(check: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            check: check.to_string(),
            status,
            message: message.into(),
        }
    }
}

/// Overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// No issues and no warnings.
    Healthy,
    /// No issues, at least one warning.
    HealthyWithWarnings,
    /// At least one issue.
    Unhealthy,
}

/// Every check that ran, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    fn push(&mut self, check: &str, status: CheckStatus, message: impl Into<String>) {
        self.checks.push(CheckResult::new(check, status, message));
    }

    fn with_status(&self, status: CheckStatus) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(move |c| c.status == status)
    }

    /// Failed checks.
    pub fn issues(&self) -> impl Iterator<Item = &CheckResult> {
        self.with_status(CheckStatus::Fail)
    }

    /// Checks that passed with a warning.
    pub fn warnings(&self) -> impl Iterator<Item = &CheckResult> {
        self.with_status(CheckStatus::Warning)
    }

    #[must_use]
    pub fn health(&self) -> Health {
        if self.issues().next().is_some() {
            Health::Unhealthy
        } else if self.warnings().next().is_some() {
            Health::HealthyWithWarnings
        } else {
            Health::Healthy
        }
    }
}

/// Thresholds for [`Auditor::doctor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoctorOptions {
    /// Free space below this is a warning.
    pub min_free_bytes: u64,
}

impl Default for DoctorOptions {
    fn default() -> Self {
        Self {
            min_free_bytes: MIN_FREE_SPACE_BYTES,
        }
    }
}

impl<R: Remote> Auditor<'_, R> {
    /// Run every health check.
    ///
    /// Never fails; problems reading anything become findings.
    pub async fn doctor(&self, registrar: &dyn PathRegistrar, options: DoctorOptions) -> DoctorReport {
        let mut report = DoctorReport::default();

        self.check_directories(&mut report);

        let registry = match self.load_registry().await {
            Ok(registry) => {
                report.push(
                    "registry",
                    CheckStatus::Pass,
                    format!("{} app(s) recorded", registry.len()),
                );
                Some(registry)
            }
            Err(e) => {
                report.push("registry", CheckStatus::Fail, e.to_string());
                None
            }
        };

        let bin = self.layout.bin_dir();
        if registrar.is_registered(&bin) {
            report.push("path", CheckStatus::Pass, format!("{} is on PATH", bin.display()));
        } else {
            report.push(
                "path",
                CheckStatus::Warning,
                format!("{} is not on PATH; run 'cmam path --add'", bin.display()),
            );
        }

        if let Some(registry) = &registry {
            self.check_artifacts(&mut report, registry);
            self.check_bin_contents(&mut report, registry).await;
        }

        if self.remote.remote_reachable().await {
            report.push("remote", CheckStatus::Pass, "release host is reachable");
        } else {
            report.push("remote", CheckStatus::Fail, "release host is unreachable");
        }
        if self.remote.catalog_reachable().await {
            report.push("catalog", CheckStatus::Pass, "catalog is reachable");
        } else {
            report.push("catalog", CheckStatus::Fail, "catalog is unreachable");
        }

        self.check_disk_space(&mut report, options);

        debug!("Doctor finished: {:?}", report.health());
        report
    }

    fn check_directories(&self, report: &mut DoctorReport) {
        let missing: Vec<String> = [
            self.layout.root().to_path_buf(),
            self.layout.bin_dir(),
            self.layout.backups_dir(),
        ]
        .iter()
        .filter(|dir| !dir.is_dir())
        .map(|dir| dir.display().to_string())
        .collect();

        if missing.is_empty() {
            report.push("directories", CheckStatus::Pass, "install directories exist");
        } else {
            report.push(
                "directories",
                CheckStatus::Fail,
                format!("missing: {}", missing.join(", ")),
            );
        }
    }

    fn check_artifacts(&self, report: &mut DoctorReport, registry: &Registry) {
        let mut missing = Vec::new();
        for (name, _) in registry.iter() {
            let artifact = self.layout.artifact_path(name);
            if !artifact.is_file() {
                missing.push(name.to_string());
                continue;
            }
            if let Some(shadow) = shadowing_path(&self.layout.artifact_file_name(name), &artifact) {
                report.push(
                    "shadowing",
                    CheckStatus::Warning,
                    format!("{name} resolves to {} instead of {}", shadow.display(), artifact.display()),
                );
            }
        }

        if missing.is_empty() {
            report.push("artifacts", CheckStatus::Pass, "every registered app has its artifact");
        } else {
            report.push(
                "artifacts",
                CheckStatus::Fail,
                format!("missing artifact for: {} (run 'cmam repair <app>')", missing.join(", ")),
            );
        }
    }

    async fn check_bin_contents(&self, report: &mut DoctorReport, registry: &Registry) {
        let scan = match scan_bin(self.layout, registry).await {
            Ok(scan) => scan,
            Err(e) => {
                report.push("orphans", CheckStatus::Warning, e.to_string());
                return;
            }
        };

        if scan.orphans.is_empty() {
            report.push("orphans", CheckStatus::Pass, "no orphaned artifacts");
        } else {
            let names: Vec<&str> = scan.orphans.iter().map(|(name, _)| name.as_str()).collect();
            report.push(
                "orphans",
                CheckStatus::Warning,
                format!("artifacts without a registry entry: {} (run 'cmam clean')", names.join(", ")),
            );
        }

        if !scan.staging.is_empty() {
            report.push(
                "staging",
                CheckStatus::Warning,
                format!("{} leftover staging file(s) (run 'cmam clean')", scan.staging.len()),
            );
        }
    }

    fn check_disk_space(&self, report: &mut DoctorReport, options: DoctorOptions) {
        let existing = nearest_existing(self.layout.root());
        match fs4::available_space(&existing) {
            Ok(available) if available < options.min_free_bytes => report.push(
                "disk space",
                CheckStatus::Warning,
                format!(
                    "only {} free (below {})",
                    format_bytes(available),
                    format_bytes(options.min_free_bytes)
                ),
            ),
            Ok(available) => {
                report.push("disk space", CheckStatus::Pass, format!("{} free", format_bytes(available)));
            }
            Err(e) => report.push(
                "disk space",
                CheckStatus::Warning,
                format!("cannot determine free space at {}: {e}", existing.display()),
            ),
        }
    }
}

/// First existing directory at or above `path`.
fn nearest_existing(path: &Path) -> PathBuf {
    path.ancestors()
        .find(|p| p.exists())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Where `file_name` resolves on PATH, if that is somewhere other than `expected`.
fn shadowing_path(file_name: &str, expected: &Path) -> Option<PathBuf> {
    let found = which::which(file_name).ok()?;
    let same = match (found.canonicalize(), expected.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => found == expected,
    };
    (!same).then_some(found)
}
