//! Fetch, verify and atomically replace an artifact.
//!
//! Every operation that puts new bytes at a canonical path (install, update,
//! import, repair, self-update) goes through this module:
//!
//! 1. [`fetch_verify_stage`] streams the artifact into a staging file in the
//!    destination's directory (`.<app>.<random>.part`), hashing each chunk as
//!    it is written.
//! 2. The digest is checked against the release's published checksum. A
//!    mismatch deletes the staging file and fails with
//!    [`CmamError::ChecksumMismatch`]; no checksum at all is a warning.
//! 3. [`StagedArtifact::commit`] renames the staging file over the
//!    destination. This rename is the only step that touches the canonical
//!    path.
//!
//! Callers that need to act between verification and commit (update backs up
//! the current artifact there) hold the [`StagedArtifact`]; the rest use
//! [`fetch_verify_replace`]. A staged artifact that is dropped without being
//! committed deletes its staging file.

pub mod verification;

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tempfile::{Builder, NamedTempFile};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::InstallLayout;
use crate::constants::STAGING_SUFFIX;
use crate::core::{CmamError, Result};
use crate::lifecycle::events::{EventSink, LifecycleEvent};
use crate::transport::ArtifactTransport;

pub use verification::{StreamingDigest, ensure_supported, file_digest, verify_digest};

/// What to fetch and where it goes.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// App name, used for staging file names, events and errors
    pub app: &'a str,
    /// Download URL
    pub url: &'a str,
    /// Published tagged checksum, if any
    pub expected_checksum: Option<&'a str>,
    /// Canonical destination path
    pub dest: &'a Path,
}

/// Whether the artifact was checked against a published checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The digest matched the published checksum.
    Verified,
    /// No checksum was published.
    Unverified,
}

/// A fully downloaded, verified artifact waiting to be committed.
#[derive(Debug)]
pub struct StagedArtifact {
    app: String,
    file: NamedTempFile,
    dest: PathBuf,
    digest: String,
    bytes: u64,
    verification: Verification,
}

impl StagedArtifact {
    /// Tagged digest of the staged bytes.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Size in bytes.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Verification outcome.
    #[must_use]
    pub const fn verification(&self) -> Verification {
        self.verification
    }

    /// Current location of the staging file.
    #[must_use]
    pub fn staging_path(&self) -> &Path {
        self.file.path()
    }

    /// Destination the artifact will be committed to.
    #[must_use]
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Rename the staging file over the destination.
    ///
    /// # Errors
    ///
    /// Fails if the rename fails; the staging file is then removed and the
    /// destination is unchanged.
    pub fn commit(self) -> Result<PathBuf> {
        let Self { app, file, dest, .. } = self;
        file.persist(&dest).map_err(|e| CmamError::fs("replace", &dest, e.error))?;
        info!("Committed {} to {}", app, dest.display());
        Ok(dest)
    }

    /// Delete the staging file without committing.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be removed.
    pub fn discard(self) -> Result<()> {
        let path = self.file.path().to_path_buf();
        self.file.close().map_err(|e| CmamError::fs("remove", &path, e))
    }
}

/// Download `request.url` into a staging file next to `request.dest` and
/// verify it.
///
/// # Errors
///
/// - transport errors from opening or reading the stream, including a body
///   shorter than its advertised length or an empty body of unknown length
/// - [`CmamError::UnsupportedChecksum`] / [`CmamError::ChecksumMismatch`]
/// - filesystem errors writing the staging file
///
/// On any error the staging file is removed and the destination is untouched.
pub async fn fetch_verify_stage<T>(
    transport: &T,
    request: FetchRequest<'_>,
    sink: &dyn EventSink,
) -> Result<StagedArtifact>
where
    T: ArtifactTransport + ?Sized,
{
    let FetchRequest {
        app,
        url,
        expected_checksum,
        dest,
    } = request;

    if let Some(expected) = expected_checksum {
        ensure_supported(app, expected)?;
    }

    let dir = dest.parent().ok_or_else(|| CmamError::Other {
        message: format!("{} has no parent directory", dest.display()),
    })?;
    tokio::fs::create_dir_all(dir).await.map_err(|e| CmamError::fs("create directory", dir, e))?;

    let staging = Builder::new()
        .prefix(&InstallLayout::staging_prefix(app))
        .suffix(STAGING_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| CmamError::fs("create staging file in", dir, e))?;
    debug!("Staging {} at {}", app, staging.path().display());

    let mut stream = transport.open_artifact(url).await?;
    let total = stream.total_len;
    let handle = staging.as_file().try_clone().map_err(|e| CmamError::fs("open", staging.path(), e))?;
    let mut file = tokio::fs::File::from_std(handle);
    let mut digest = StreamingDigest::new();

    sink.emit(LifecycleEvent::Downloading {
        app: app.to_string(),
        downloaded: 0,
        total,
    });

    while let Some(chunk) = stream.chunks.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await.map_err(|e| CmamError::fs("write", staging.path(), e))?;
        digest.update(&chunk);
        sink.emit(LifecycleEvent::Downloading {
            app: app.to_string(),
            downloaded: digest.bytes(),
            total,
        });
    }

    let bytes = digest.bytes();
    match total {
        Some(total) if bytes != total => {
            return Err(CmamError::transport(
                "downloading artifact",
                format!("stream ended after {bytes} of {total} bytes"),
            ));
        }
        None if bytes == 0 => {
            return Err(CmamError::transport("downloading artifact", "server sent an empty body"));
        }
        None if expected_checksum.is_none() => warn!(
            "{} was served without a length or checksum; a truncated download cannot be detected",
            app
        ),
        _ => {}
    }

    file.flush().await.map_err(|e| CmamError::fs("flush", staging.path(), e))?;
    file.sync_all().await.map_err(|e| CmamError::fs("sync", staging.path(), e))?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(staging.path(), std::fs::Permissions::from_mode(0o755))
            .await
            .map_err(|e| CmamError::fs("set permissions on", staging.path(), e))?;
    }

    sink.emit(LifecycleEvent::Verifying { app: app.to_string() });
    let actual = digest.finalize();
    let verification = match expected_checksum {
        Some(expected) => {
            if let Err(e) = verify_digest(app, expected, &actual) {
                let path = staging.path().to_path_buf();
                if let Err(close_error) = staging.close() {
                    warn!("Failed to remove staging file {}: {}", path.display(), close_error);
                }
                return Err(e);
            }
            sink.emit(LifecycleEvent::Verified {
                app: app.to_string(),
                digest: actual.clone(),
            });
            Verification::Verified
        }
        None => {
            warn!("No checksum published for {}; installing unverified", app);
            sink.emit(LifecycleEvent::Unverified { app: app.to_string() });
            Verification::Unverified
        }
    };

    debug!("Staged {} ({} bytes, {})", app, bytes, actual);
    Ok(StagedArtifact {
        app: app.to_string(),
        file: staging,
        dest: dest.to_path_buf(),
        digest: actual,
        bytes,
        verification,
    })
}

/// Stage, verify and commit in one step.
///
/// # Errors
///
/// See [`fetch_verify_stage`] and [`StagedArtifact::commit`].
pub async fn fetch_verify_replace<T>(
    transport: &T,
    request: FetchRequest<'_>,
    sink: &dyn EventSink,
) -> Result<Verification>
where
    T: ArtifactTransport + ?Sized,
{
    let staged = fetch_verify_stage(transport, request, sink).await?;
    let verification = staged.verification();
    sink.emit(LifecycleEvent::Committing {
        app: request.app.to_string(),
    });
    staged.commit()?;
    Ok(verification)
}
