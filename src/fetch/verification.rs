//! SHA-256 digests in the tagged `sha256:<hex>` form.
//!
//! Releases publish checksums as `<algorithm>:<hex>`. Only `sha256` can be
//! verified; any other algorithm is refused, never skipped.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::core::{CmamError, Result};

const ALGORITHM: &str = "sha256";

/// Incremental SHA-256 over a byte stream.
#[derive(Debug, Clone, Default)]
pub struct StreamingDigest {
    hasher: Sha256,
    bytes: u64,
}

impl StreamingDigest {
    /// Start an empty digest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Bytes fed so far.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Finish and return the tagged digest.
    #[must_use]
    pub fn finalize(self) -> String {
        format!("{ALGORITHM}:{}", hex::encode(self.hasher.finalize()))
    }
}

/// Tagged SHA-256 digest of a file, read in chunks.
///
/// # Errors
///
/// Fails if the file cannot be opened or read.
pub async fn file_digest(path: &Path) -> Result<String> {
    debug!("Computing SHA256 checksum for {}", path.display());

    let mut file = tokio::fs::File::open(path).await.map_err(|e| CmamError::fs("open", path, e))?;
    let mut digest = StreamingDigest::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await.map_err(|e| CmamError::fs("read", path, e))?;
        if read == 0 {
            break;
        }
        digest.update(&buffer[..read]);
    }
    Ok(digest.finalize())
}

/// Check that a published checksum uses an algorithm we can verify.
///
/// # Errors
///
/// Returns [`CmamError::UnsupportedChecksum`] unless the checksum is tagged
/// `sha256:` and carries a value. The value itself is only checked by
/// [`verify_digest`].
pub fn ensure_supported(app: &str, expected: &str) -> Result<()> {
    let unsupported = || CmamError::UnsupportedChecksum {
        name: app.to_string(),
        checksum: expected.to_string(),
    };

    let (algorithm, value) = expected.split_once(':').ok_or_else(unsupported)?;
    if algorithm != ALGORITHM || value.trim().is_empty() {
        return Err(unsupported());
    }
    Ok(())
}

/// Compare a computed digest against the published one by exact string
/// equality of the tagged form.
///
/// # Errors
///
/// Returns [`CmamError::ChecksumMismatch`] when they differ.
pub fn verify_digest(app: &str, expected: &str, actual: &str) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CmamError::ChecksumMismatch {
            name: app.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
