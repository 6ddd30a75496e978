//! Release resolution and artifact selection.
//!
//! Given a source locator and an optional pinned version, [`resolve_release`]
//! asks the release transport for the matching [`ReleaseDescriptor`] and
//! [`select_artifact`] picks the installable asset from it:
//!
//! - no version: the source's latest release
//! - `1.2.0` or `v1.2.0`: the release tagged exactly `v1.2.0`
//!
//! A 404 from the source is [`CmamError::ReleaseNotFound`]. Every other
//! transport failure propagates as a transport error and is never reported
//! as "not found".

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{CmamError, Result};
use crate::transport::ReleaseTransport;
use crate::version::{same_version, strip_v};

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// File name as published
    pub filename: String,
    /// Direct download URL
    pub download_url: String,
    /// Tagged digest (`sha256:<hex>`), when the source publishes one
    pub expected_checksum: Option<String>,
}

/// A tagged release and its assets in published order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Release tag, usually `v<version>`
    pub tag: String,
    /// Assets in the order the source lists them
    pub assets: Vec<AssetInfo>,
}

impl ReleaseDescriptor {
    /// The version this release represents: its tag without a leading `v`.
    #[must_use]
    pub fn version(&self) -> String {
        strip_v(&self.tag).to_string()
    }
}

/// The release and asset chosen for an app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Source locator the release came from
    pub locator: String,
    /// Release tag
    pub tag: String,
    /// Version derived from the tag
    pub version: String,
    /// Selected asset
    pub asset: AssetInfo,
}

impl ResolvedArtifact {
    /// Check that a pinned request for `name` got the version it asked for.
    ///
    /// # Errors
    ///
    /// Returns [`CmamError::VersionMismatch`] when `requested` is set and the
    /// resolved release carries another version.
    pub fn ensure_pinned(&self, name: &str, requested: Option<&str>) -> Result<()> {
        match requested {
            Some(requested) if !same_version(requested, &self.version) => {
                Err(CmamError::VersionMismatch {
                    name: name.to_string(),
                    requested: requested.to_string(),
                    resolved: self.version.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Tag requested for a pinned version: `1.2.0` and `v1.2.0` both map to `v1.2.0`.
#[must_use]
pub fn tag_for_version(version: &str) -> String {
    format!("v{}", strip_v(version))
}

/// Pick the first asset whose file name ends with `suffix`, case-insensitively.
///
/// The first match wins even if a later asset would fit better. An empty
/// suffix selects the first asset.
///
/// # Errors
///
/// Returns [`CmamError::NoArtifactFound`] when no asset matches.
pub fn select_artifact<'a>(
    locator: &str,
    release: &'a ReleaseDescriptor,
    suffix: &str,
) -> Result<&'a AssetInfo> {
    let suffix = suffix.to_lowercase();
    release
        .assets
        .iter()
        .find(|asset| asset.filename.to_lowercase().ends_with(&suffix))
        .ok_or_else(|| CmamError::NoArtifactFound {
            locator: locator.to_string(),
            tag: release.tag.clone(),
            suffix: suffix.clone(),
        })
}

/// Resolve the release for `locator`, latest or pinned.
///
/// # Errors
///
/// [`CmamError::ReleaseNotFound`] when the source has no such release; any
/// transport error is propagated unchanged.
pub async fn resolve_release<T>(
    transport: &T,
    locator: &str,
    version: Option<&str>,
) -> Result<ReleaseDescriptor>
where
    T: ReleaseTransport + ?Sized,
{
    let release = match version {
        Some(version) => {
            let tag = tag_for_version(version);
            debug!("Resolving {} at tag {}", locator, tag);
            transport.release_by_tag(locator, &tag).await?.ok_or_else(|| {
                CmamError::ReleaseNotFound {
                    locator: locator.to_string(),
                    tag: Some(tag.clone()),
                }
            })?
        }
        None => {
            debug!("Resolving latest release of {}", locator);
            transport.latest_release(locator).await?.ok_or_else(|| CmamError::ReleaseNotFound {
                locator: locator.to_string(),
                tag: None,
            })?
        }
    };

    debug!("Resolved {} to {} with {} assets", locator, release.tag, release.assets.len());
    Ok(release)
}

/// Resolve the release and select its artifact in one step.
///
/// # Errors
///
/// Same as [`resolve_release`] plus [`CmamError::NoArtifactFound`].
pub async fn resolve_artifact<T>(
    transport: &T,
    locator: &str,
    version: Option<&str>,
    suffix: &str,
) -> Result<ResolvedArtifact>
where
    T: ReleaseTransport + ?Sized,
{
    let release = resolve_release(transport, locator, version).await?;
    let asset = select_artifact(locator, &release, suffix)?.clone();
    Ok(ResolvedArtifact {
        locator: locator.to_string(),
        version: release.version(),
        tag: release.tag,
        asset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> AssetInfo {
        AssetInfo {
            filename: name.to_string(),
            download_url: format!("https://example.com/{name}"),
            expected_checksum: None,
        }
    }

    fn release(names: &[&str]) -> ReleaseDescriptor {
        ReleaseDescriptor {
            tag: "v1.0.0".to_string(),
            assets: names.iter().map(|n| asset(n)).collect(),
        }
    }

    #[test]
    fn test_first_matching_asset_wins() {
        let release = release(&["notes.txt", "foo-setup.EXE", "foo.exe"]);
        let selected = select_artifact("x/foo", &release, ".exe").unwrap();
        assert_eq!(selected.filename, "foo-setup.EXE");
    }

    #[test]
    fn test_no_matching_asset() {
        let release = release(&["foo.tar.gz"]);
        let err = select_artifact("x/foo", &release, ".exe").unwrap_err();
        assert!(matches!(err, CmamError::NoArtifactFound { .. }));
        assert_eq!(err.kind(), crate::core::ErrorKind::NotFound);

        let empty = ReleaseDescriptor {
            tag: "v1.0.0".into(),
            assets: Vec::new(),
        };
        assert!(select_artifact("x/foo", &empty, "").is_err());
    }

    #[test]
    fn test_ensure_pinned() {
        let resolved = ResolvedArtifact {
            locator: "x/foo".into(),
            tag: "v1.2.0".into(),
            version: "1.2.0".into(),
            asset: asset("foo.exe"),
        };
        assert!(resolved.ensure_pinned("foo", None).is_ok());
        assert!(resolved.ensure_pinned("foo", Some("1.2.0")).is_ok());
        assert!(resolved.ensure_pinned("foo", Some("v1.2.0")).is_ok());

        let err = resolved.ensure_pinned("foo", Some("1.3.0")).unwrap_err();
        match err {
            CmamError::VersionMismatch { name, requested, resolved } => {
                assert_eq!(name, "foo");
                assert_eq!(requested, "1.3.0");
                assert_eq!(resolved, "1.2.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tag_and_version_mapping() {
        assert_eq!(tag_for_version("1.2.0"), "v1.2.0");
        assert_eq!(tag_for_version("v1.2.0"), "v1.2.0");
        assert_eq!(release(&[]).version(), "1.0.0");
    }
}
