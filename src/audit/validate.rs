//! Checksum validation and trust classification of installed apps.

use serde::Serialize;
use tracing::{debug, warn};

use super::Auditor;
use crate::catalog::Catalog;
use crate::core::Result;
use crate::fetch::{ensure_supported, file_digest};
use crate::release::resolve_artifact;
use crate::transport::Remote;

/// Why an app failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidReason {
    /// No artifact at the canonical path.
    Missing,
    /// The artifact's digest differs from the published checksum.
    Mismatch { expected: String, actual: String },
}

/// Why an app could not be verified either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnknownReason {
    /// The catalog has no entry for the app.
    NotInCatalog,
    /// The recorded release publishes no checksum.
    NoChecksum,
    /// The published checksum uses an algorithm we cannot compute.
    UnsupportedChecksum { checksum: String },
    /// The catalog or release could not be fetched.
    RemoteUnavailable { message: String },
}

/// Three-way validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ValidationStatus {
    /// Present and matching the published checksum.
    Valid,
    /// Proven broken.
    Invalid(InvalidReason),
    /// Cannot be checked.
    Unknown(UnknownReason),
}

impl ValidationStatus {
    /// Short label for display.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid(_) => "invalid",
            Self::Unknown(_) => "unknown",
        }
    }

    /// One-line explanation.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Valid => "checksum matches".to_string(),
            Self::Invalid(InvalidReason::Missing) => "artifact is missing".to_string(),
            Self::Invalid(InvalidReason::Mismatch { expected, actual }) => {
                format!("checksum mismatch (expected {expected}, got {actual})")
            }
            Self::Unknown(UnknownReason::NotInCatalog) => "not in the catalog".to_string(),
            Self::Unknown(UnknownReason::NoChecksum) => "no published checksum".to_string(),
            Self::Unknown(UnknownReason::UnsupportedChecksum { checksum }) => {
                format!("unsupported checksum '{checksum}'")
            }
            Self::Unknown(UnknownReason::RemoteUnavailable { message }) => {
                format!("remote unavailable: {message}")
            }
        }
    }
}

/// Validation result for one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppValidation {
    pub name: String,
    pub version: String,
    pub status: ValidationStatus,
}

/// Validation results in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub apps: Vec<AppValidation>,
}

impl ValidationReport {
    fn count(&self, label: &str) -> usize {
        self.apps.iter().filter(|app| app.status.label() == label).count()
    }

    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.count("valid")
    }

    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.count("invalid")
    }

    #[must_use]
    pub fn unknown_count(&self) -> usize {
        self.count("unknown")
    }

    /// True when nothing is proven invalid.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.invalid_count() == 0
    }
}

/// Provenance classification derived from validation.
///
/// Not being in the catalog is [`UnknownSource`](Self::UnknownSource), which
/// is distinct from a proven mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustLevel {
    /// Matches the checksum published by its catalog source.
    Trusted,
    /// Differs from the published checksum.
    Untrusted,
    /// From a known source, but could not be checked.
    Unverified,
    /// Not in the catalog.
    UnknownSource,
}

impl From<&ValidationStatus> for TrustLevel {
    fn from(status: &ValidationStatus) -> Self {
        match status {
            ValidationStatus::Valid => Self::Trusted,
            ValidationStatus::Invalid(InvalidReason::Mismatch { .. }) => Self::Untrusted,
            ValidationStatus::Unknown(UnknownReason::NotInCatalog) => Self::UnknownSource,
            ValidationStatus::Invalid(InvalidReason::Missing) | ValidationStatus::Unknown(_) => {
                Self::Unverified
            }
        }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Trusted => "trusted",
            Self::Untrusted => "untrusted",
            Self::Unverified => "unverified",
            Self::UnknownSource => "unknown source",
        })
    }
}

/// Trust result for one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppTrust {
    pub name: String,
    pub version: String,
    pub trust: TrustLevel,
    /// The validation it was derived from
    pub status: ValidationStatus,
}

impl<R: Remote> Auditor<'_, R> {
    /// Validate every registry entry.
    ///
    /// An unreachable catalog does not fail the call; affected apps are
    /// reported as [`UnknownReason::RemoteUnavailable`].
    ///
    /// # Errors
    ///
    /// Fails only if the registry cannot be read.
    pub async fn validate(&self) -> Result<ValidationReport> {
        let registry = self.load_registry().await?;
        let mut report = ValidationReport::default();
        if registry.is_empty() {
            return Ok(report);
        }

        let catalog = self.remote.fetch_catalog().await.map_err(|e| {
            warn!("Cannot fetch catalog for validation: {}", e);
            e.to_string()
        });

        for (name, package) in registry.iter() {
            let status = self.validate_one(catalog.as_ref(), name, &package.version).await;
            debug!("{} {}: {}", name, package.version, status.describe());
            report.apps.push(AppValidation {
                name: name.to_string(),
                version: package.version.clone(),
                status,
            });
        }
        Ok(report)
    }

    async fn validate_one(
        &self,
        catalog: std::result::Result<&Catalog, &String>,
        name: &str,
        version: &str,
    ) -> ValidationStatus {
        let artifact = self.layout.artifact_path(name);
        if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
            return ValidationStatus::Invalid(InvalidReason::Missing);
        }

        let catalog = match catalog {
            Ok(catalog) => catalog,
            Err(message) => {
                return ValidationStatus::Unknown(UnknownReason::RemoteUnavailable {
                    message: message.clone(),
                });
            }
        };
        let Some(entry) = catalog.get(name) else {
            return ValidationStatus::Unknown(UnknownReason::NotInCatalog);
        };

        let resolved = match resolve_artifact(
            self.remote,
            &entry.source_locator,
            Some(version),
            self.layout.suffix(),
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) => {
                return ValidationStatus::Unknown(UnknownReason::RemoteUnavailable {
                    message: e.to_string(),
                });
            }
        };

        let Some(expected) = resolved.asset.expected_checksum else {
            return ValidationStatus::Unknown(UnknownReason::NoChecksum);
        };
        if ensure_supported(name, &expected).is_err() {
            return ValidationStatus::Unknown(UnknownReason::UnsupportedChecksum { checksum: expected });
        }

        match file_digest(&artifact).await {
            Ok(actual) if actual == expected => ValidationStatus::Valid,
            Ok(actual) => ValidationStatus::Invalid(InvalidReason::Mismatch { expected, actual }),
            Err(e) => {
                warn!("Cannot read {}: {}", artifact.display(), e);
                ValidationStatus::Invalid(InvalidReason::Missing)
            }
        }
    }

    /// Trust classification of every registry entry.
    ///
    /// # Errors
    ///
    /// Fails only if the registry cannot be read.
    pub async fn trust(&self) -> Result<Vec<AppTrust>> {
        Ok(self
            .validate()
            .await?
            .apps
            .into_iter()
            .map(|app| AppTrust {
                trust: TrustLevel::from(&app.status),
                name: app.name,
                version: app.version,
                status: app.status,
            })
            .collect())
    }
}
