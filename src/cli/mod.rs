//! Command-line interface for CMAM.
//!
//! Each command lives in its own module with a `clap` argument struct and an
//! `execute` method taking the shared [`CommandContext`]. Commands translate
//! arguments into engine or auditor calls and render the outcome; none of
//! them touch the install root directly.
//!
//! # Commands
//!
//! ## Lifecycle
//! - `install` / `update` / `rollback` / `repair` / `uninstall`
//! - `import` / `export` - move a set of installed apps between machines
//! - `self-update` - replace the running `cmam` binary
//!
//! ## Information
//! - `list`, `info`, `search`, `backups`
//!
//! ## Maintenance
//! - `validate`, `trust`, `doctor`, `clean`, `path`, `config`
//!
//! # Exit codes
//!
//! `0` on success, `2` when a batch command finished with failed items, and
//! a per-category code for any other failure (see [`crate::core`]).
//!
//! ```bash
//! cmam install foo
//! cmam update --all
//! cmam rollback foo            # list backups
//! cmam rollback foo 1.0.0      # restore one
//! cmam --root ./sandbox doctor
//! ```

mod audit;
mod backups;
mod common;
mod config;
mod info;
mod install;
mod list;
mod path;
mod repair;
mod rollback;
mod search;
mod self_update;
mod snapshot;
mod uninstall;
mod update;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use common::{CommandContext, CommandOutcome, ProgressSink};

/// Global options shared by every command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GlobalArgs {
    /// Install root (overrides CMAM_ROOT and the configured root)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Disable progress bars
    #[arg(long, global = true, env = "CMAM_NO_PROGRESS")]
    pub no_progress: bool,
}

/// CMAM - install and manage prebuilt application binaries.
#[derive(Parser)]
#[command(
    name = "cmam",
    about = "CMAM - install, update and roll back prebuilt application binaries",
    version,
    author,
    long_about = "CMAM installs application binaries published as release artifacts, verifies \
                  them against published checksums, keeps backups of replaced versions and \
                  audits the install root for drift."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub globals: GlobalArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Install an app from the catalog
    Install(install::InstallCommand),
    /// Update one app, or every installed app with --all
    Update(update::UpdateCommand),
    /// List backups of an app, or restore one
    Rollback(rollback::RollbackCommand),
    /// Reinstall an app at its recorded version
    Repair(repair::RepairCommand),
    /// Remove an installed app
    Uninstall(uninstall::UninstallCommand),
    /// List installed apps
    List(list::ListCommand),
    /// Show catalog and install details of an app
    Info(info::InfoCommand),
    /// Search the catalog
    Search(search::SearchCommand),
    /// List the backup chain
    Backups(backups::BackupsCommand),
    /// Check installed artifacts against published checksums
    Validate(audit::ValidateCommand),
    /// Classify installed apps by provenance
    Trust(audit::TrustCommand),
    /// Run health checks on the install root
    Doctor(audit::DoctorCommand),
    /// Remove caches, staging litter, orphans and optionally backups
    Clean(audit::CleanCommand),
    /// Show or register the bin directory on PATH
    Path(path::PathCommand),
    /// Write the installed app set to a snapshot file
    Export(snapshot::ExportCommand),
    /// Install the app set recorded in a snapshot file
    Import(snapshot::ImportCommand),
    /// Update cmam itself
    #[command(name = "self-update")]
    SelfUpdate(self_update::SelfUpdateCommand),
    /// Show or change configuration
    Config(config::ConfigCommand),
}

impl Cli {
    /// Log filter used when `RUST_LOG` is not set.
    #[must_use]
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose {
            "cmam_cli=debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Whatever the command fails with; batch commands report per-item
    /// failures through [`CommandOutcome::PartialFailure`] instead.
    pub async fn execute(self) -> Result<CommandOutcome> {
        let ctx = CommandContext::load(&self.globals).await?;

        match self.command {
            Commands::Install(cmd) => cmd.execute(&ctx).await,
            Commands::Update(cmd) => cmd.execute(&ctx).await,
            Commands::Rollback(cmd) => cmd.execute(&ctx).await,
            Commands::Repair(cmd) => cmd.execute(&ctx).await,
            Commands::Uninstall(cmd) => cmd.execute(&ctx).await,
            Commands::List(cmd) => cmd.execute(&ctx).await,
            Commands::Info(cmd) => cmd.execute(&ctx).await,
            Commands::Search(cmd) => cmd.execute(&ctx).await,
            Commands::Backups(cmd) => cmd.execute(&ctx).await,
            Commands::Validate(cmd) => cmd.execute(&ctx).await,
            Commands::Trust(cmd) => cmd.execute(&ctx).await,
            Commands::Doctor(cmd) => cmd.execute(&ctx).await,
            Commands::Clean(cmd) => cmd.execute(&ctx).await,
            Commands::Path(cmd) => cmd.execute(&ctx),
            Commands::Export(cmd) => cmd.execute(&ctx).await,
            Commands::Import(cmd) => cmd.execute(&ctx).await,
            Commands::SelfUpdate(cmd) => cmd.execute(&ctx).await,
            Commands::Config(cmd) => cmd.execute(&ctx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_filter() {
        let cli = Cli::parse_from(["cmam", "--verbose", "list"]);
        assert_eq!(cli.default_log_filter(), "cmam_cli=debug");
        let cli = Cli::parse_from(["cmam", "list", "-q"]);
        assert_eq!(cli.default_log_filter(), "error");
        let cli = Cli::parse_from(["cmam", "list"]);
        assert_eq!(cli.default_log_filter(), "warn");
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["cmam", "-v", "-q", "list"]).is_err());
    }

    #[test]
    fn test_root_flag_is_global() {
        let cli = Cli::try_parse_from(["cmam", "install", "foo", "--root", "/tmp/x"]).unwrap();
        assert_eq!(cli.globals.root, Some(PathBuf::from("/tmp/x")));
    }
}
