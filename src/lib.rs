//! CMAM - a package lifecycle manager for prebuilt application binaries.
//!
//! CMAM installs applications that are published as release artifacts of a
//! source repository. A remote catalog maps app names to their source; the
//! local registry records what is installed; a backup chain keeps replaced
//! versions around for rollback.
//!
//! # Architecture Overview
//!
//! - The **catalog** (`packages.json`) maps an app name to a source locator
//!   (`owner/repo`). It is fetched on demand and never cached as truth.
//! - The **registry** (`<root>/registry.toml`) maps each installed app to its
//!   version. It is the only record of what is installed and is always
//!   written last.
//! - Artifacts live at `<root>/bin/<app><suffix>` and are only ever replaced
//!   by renaming a verified staging file over them.
//! - Backups live at `<root>/backups/<app>/<version>/<app><suffix>`.
//!
//! ```text
//! resolve catalog -> resolve release -> stage + verify -> [backup] -> rename -> registry
//! ```
//!
//! # Core Modules
//!
//! ## Lifecycle
//! - [`lifecycle`] - install, update, rollback, repair, uninstall, batch
//!   update, import and self-update
//! - [`fetch`] - streaming download, SHA-256 verification and atomic replace
//! - [`backup`] - the per-app backup chain
//! - [`registry`] - the persisted installed-app map
//!
//! ## Resolution
//! - [`catalog`] - catalog parsing, lookup and "did you mean" suggestions
//! - [`release`] - release and artifact selection
//! - [`version`] - version parsing and ordering
//! - [`transport`] - remote traits and the GitHub implementation
//!
//! ## Maintenance
//! - [`audit`] - validate, trust, doctor and clean
//! - [`platform`] - PATH registration
//!
//! ## Supporting Modules
//! - [`cli`] - command-line interface
//! - [`config`] - configuration file and install layout
//! - [`core`] - error taxonomy
//! - [`constants`] - defaults and thresholds
//! - [`utils`] - filesystem helpers and progress bars
//!
//! # Command-Line Usage
//!
//! ```bash
//! cmam install foo
//! cmam update foo --version 1.2.0
//! cmam update --all
//! cmam rollback foo 1.1.0
//! cmam doctor
//! ```

// Lifecycle
pub mod backup;
pub mod fetch;
pub mod lifecycle;
pub mod registry;

// Resolution
pub mod catalog;
pub mod release;
pub mod transport;
pub mod version;

// Maintenance
pub mod audit;
pub mod platform;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
