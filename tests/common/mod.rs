//! Shared helpers for the CMAM integration tests
//!
//! [`CliRoot`] wraps a temporary install root and builds `cmam` invocations
//! pointed at it. State is seeded by writing the registry, artifacts and
//! backups directly, so CLI tests never touch the network.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Suffix the CLI uses when no config overrides it.
pub const SUFFIX: &str = ".exe";

/// A temporary install root driven through the `cmam` binary.
pub struct CliRoot {
    temp: TempDir,
}

impl CliRoot {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("create temp dir"),
        }
    }

    /// The install root passed with `--root`.
    pub fn root(&self) -> PathBuf {
        self.temp.path().join("cmam")
    }

    /// A directory outside the install root.
    pub fn scratch(&self) -> PathBuf {
        let dir = self.temp.path().join("scratch");
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    /// `cmam --root <root> --no-progress` with a clean environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cmam").expect("cmam binary");
        cmd.env_remove("CMAM_ROOT")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--root")
            .arg(self.root())
            .arg("--no-progress");
        cmd
    }

    /// Write `registry.toml` with the given `(name, version)` entries.
    pub fn seed_registry(&self, entries: &[(&str, &str)]) {
        let mut content = String::new();
        for (name, version) in entries {
            content.push_str(&format!("[packages.{name}]\nversion = \"{version}\"\n\n"));
        }
        self.write(Path::new("registry.toml"), content.as_bytes());
    }

    /// Put an artifact for `app` into `bin/`.
    pub fn seed_artifact(&self, app: &str, bytes: &[u8]) -> PathBuf {
        self.write(&Path::new("bin").join(format!("{app}{SUFFIX}")), bytes)
    }

    /// Put a backup of `app` at `version` into the chain.
    pub fn seed_backup(&self, app: &str, version: &str, bytes: &[u8]) -> PathBuf {
        self.write(&Path::new("backups").join(app).join(version).join(format!("{app}{SUFFIX}")), bytes)
    }

    pub fn artifact(&self, app: &str) -> Option<Vec<u8>> {
        fs::read(self.root().join("bin").join(format!("{app}{SUFFIX}"))).ok()
    }

    pub fn registry_text(&self) -> String {
        fs::read_to_string(self.root().join("registry.toml")).unwrap_or_default()
    }

    pub fn write(&self, relative: &Path, bytes: &[u8]) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, bytes).expect("write file");
        path
    }
}
