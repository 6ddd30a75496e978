//! PATH registration for the install root's `bin/` directory.
//!
//! Only `doctor` and `path` consult the registrar; the lifecycle engine never
//! edits the environment. [`PathRegistrar::register`] reports whether it
//! changed anything through [`PathRegistration`], and the caller decides
//! what to tell the user.
//!
//! [`ShellProfileRegistrar`] appends a marked `export PATH=...` line to the
//! user's shell profile on Unix. On Windows it refuses with manual
//! instructions.

use std::path::{Path, PathBuf};

use crate::core::{CmamError, Result};

const MARKER: &str = "# Added by cmam";

/// Outcome of a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRegistration {
    /// The directory was already registered; nothing changed.
    AlreadyPresent,
    /// The directory was added. New shells will see it.
    Added {
        /// File that was edited, if any
        profile: Option<PathBuf>,
    },
}

/// Checks and edits the user's PATH.
pub trait PathRegistrar: Send + Sync {
    /// Whether `dir` is on PATH now or registered for future shells.
    fn is_registered(&self, dir: &Path) -> bool;

    /// Register `dir`. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails when the platform store cannot be edited.
    fn register(&self, dir: &Path) -> Result<PathRegistration>;
}

/// Whether `dir` appears in the current process's PATH.
#[must_use]
pub fn in_process_path(dir: &Path) -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|entry| same_dir(&entry, dir)))
        .unwrap_or(false)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (canonical(a), canonical(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn canonical(path: &Path) -> Option<PathBuf> {
    std::fs::canonicalize(path).ok()
}

/// Registrar that edits the login shell's profile.
#[derive(Debug, Clone)]
pub struct ShellProfileRegistrar {
    profile: Option<PathBuf>,
}

impl ShellProfileRegistrar {
    /// Registrar for the profile matching `$SHELL` (`.zshrc`, `.bashrc`,
    /// otherwise `.profile`).
    #[must_use]
    pub fn detect() -> Self {
        let shell = std::env::var("SHELL").unwrap_or_default();
        let file = if shell.ends_with("zsh") {
            ".zshrc"
        } else if shell.ends_with("bash") {
            ".bashrc"
        } else {
            ".profile"
        };
        Self {
            profile: dirs::home_dir().map(|home| home.join(file)),
        }
    }

    /// Registrar for an explicit profile file.
    pub fn with_profile(profile: impl Into<PathBuf>) -> Self {
        Self {
            profile: Some(profile.into()),
        }
    }

    fn export_line(dir: &Path) -> String {
        format!("export PATH=\"{}:$PATH\"", dir.display())
    }

    fn profile_registers(&self, dir: &Path) -> bool {
        let Some(profile) = &self.profile else {
            return false;
        };
        std::fs::read_to_string(profile)
            .map(|content| content.contains(&Self::export_line(dir)))
            .unwrap_or(false)
    }
}

impl PathRegistrar for ShellProfileRegistrar {
    fn is_registered(&self, dir: &Path) -> bool {
        in_process_path(dir) || self.profile_registers(dir)
    }

    #[cfg(not(windows))]
    fn register(&self, dir: &Path) -> Result<PathRegistration> {
        use std::io::Write;

        if self.is_registered(dir) {
            tracing::debug!("{} already on PATH", dir.display());
            return Ok(PathRegistration::AlreadyPresent);
        }

        let profile = self.profile.clone().ok_or_else(|| CmamError::Config {
            message: "unable to determine home directory for the shell profile".into(),
        })?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&profile)
            .map_err(|e| CmamError::fs("open", &profile, e))?;
        writeln!(file, "\n{MARKER}\n{}", Self::export_line(dir))
            .map_err(|e| CmamError::fs("write", &profile, e))?;

        tracing::info!("Added {} to PATH in {}", dir.display(), profile.display());
        Ok(PathRegistration::Added {
            profile: Some(profile),
        })
    }

    #[cfg(windows)]
    fn register(&self, dir: &Path) -> Result<PathRegistration> {
        if self.is_registered(dir) {
            return Ok(PathRegistration::AlreadyPresent);
        }
        Err(CmamError::Config {
            message: format!(
                "automatic PATH registration is not supported here; add {} to your user PATH \
                 under System Properties > Environment Variables",
                dir.display()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(not(windows))]
    #[test]
    fn test_register_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let profile = temp.path().join(".profile");
        let bin = temp.path().join("root").join("bin");
        let registrar = ShellProfileRegistrar::with_profile(&profile);

        assert!(!registrar.is_registered(&bin));
        assert_eq!(
            registrar.register(&bin).unwrap(),
            PathRegistration::Added {
                profile: Some(profile.clone())
            }
        );
        assert!(registrar.is_registered(&bin));
        assert_eq!(registrar.register(&bin).unwrap(), PathRegistration::AlreadyPresent);

        let content = std::fs::read_to_string(&profile).unwrap();
        assert_eq!(content.matches(MARKER).count(), 1);
    }

    #[test]
    fn test_unregistered_without_profile() {
        let registrar = ShellProfileRegistrar { profile: None };
        assert!(!registrar.is_registered(Path::new("/definitely/not/on/path/cmam-bin")));
    }
}
