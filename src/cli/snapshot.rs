//! `cmam export [file]` and `cmam import <file>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome, print_batch_report};
use crate::lifecycle::Snapshot;
use crate::registry::Registry;

/// Write the installed app set to a snapshot.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Output file; prints to stdout when omitted
    pub file: Option<PathBuf>,
}

impl ExportCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let registry = Registry::load(&ctx.layout.registry_path())
            .await
            .context("Failed to read the registry")?;
        let snapshot = Snapshot::of(&registry);

        match self.file {
            Some(path) => {
                snapshot.write(&path).await?;
                eprintln!(
                    "{} Exported {} app(s) to {}",
                    "✓".green(),
                    snapshot.packages.len(),
                    path.display()
                );
            }
            None => println!("{}", snapshot.to_json()?),
        }
        Ok(CommandOutcome::Success)
    }
}

/// Install every app recorded in a snapshot at its recorded version.
#[derive(Debug, Args)]
pub struct ImportCommand {
    /// Snapshot file written by `cmam export`
    pub file: PathBuf,

    /// Do not back up artifacts that are replaced
    #[arg(long)]
    pub no_backup: bool,

    /// Stop at the first failure
    #[arg(long)]
    pub fail_fast: bool,
}

impl ImportCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let snapshot = Snapshot::read(&self.file)
            .await
            .with_context(|| format!("Failed to read snapshot {}", self.file.display()))?;

        let engine = ctx.engine()?;
        let report = engine
            .import(&snapshot, ctx.batch_options(self.no_backup, self.fail_fast))
            .await
            .context("Import failed")?;
        Ok(print_batch_report(&report, "import"))
    }
}
