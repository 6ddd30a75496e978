//! Filesystem helpers: atomic writes, size accounting and best-effort removal.

use std::path::Path;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use crate::core::{CmamError, Result};

/// Write `content` to `path` so readers see either the old file or the new
/// one, never a partial write.
///
/// The bytes go to `<path>.tmp` beside the target, are synced to disk, and
/// the temp file is renamed over `path`. Parent directories are created.
///
/// # Errors
///
/// Fails if the parent cannot be created or any write, sync or rename fails.
/// A failed rename leaves the original file untouched.
pub async fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| CmamError::fs("create directory", parent, e))?;
    }

    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    {
        let mut file =
            fs::File::create(&temp_path).await.map_err(|e| CmamError::fs("create", &temp_path, e))?;
        file.write_all(content).await.map_err(|e| CmamError::fs("write", &temp_path, e))?;
        file.sync_all().await.map_err(|e| CmamError::fs("sync", &temp_path, e))?;
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(CmamError::fs("replace", path, e));
    }

    Ok(())
}

/// Total size and file count of everything under `path`.
///
/// Missing paths count as empty. Unreadable entries are skipped.
#[must_use]
pub fn disk_usage(path: &Path) -> (u64, u64) {
    if !path.exists() {
        return (0, 0);
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold((0, 0), |(bytes, files), metadata| (bytes + metadata.len(), files + 1))
}

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` when a file was actually removed.
///
/// # Errors
///
/// Fails on any error other than `NotFound`.
pub async fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CmamError::fs("remove", path, e)),
    }
}

/// Remove a directory tree, treating "already gone" as success.
///
/// # Errors
///
/// Fails on any error other than `NotFound`.
pub async fn remove_dir_all_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CmamError::fs("remove directory", path, e)),
    }
}

/// Reject values that are not a single plain path component: empty, `.`,
/// `..`, or anything containing a separator or NUL.
///
/// # Errors
///
/// Returns [`CmamError::Other`] naming `what` and the offending value.
pub(crate) fn check_path_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.contains('\0')
    {
        return Err(CmamError::Other {
            message: format!("invalid {what} '{value}'"),
        });
    }
    Ok(())
}

/// Human-readable byte count (`1.5 MiB`).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{bytes} B") } else { format!("{value:.1} {}", UNITS[unit]) }
}
