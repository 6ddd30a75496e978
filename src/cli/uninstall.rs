//! `cmam uninstall <app> [--keep-backups]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome};
use crate::utils::format_bytes;

/// Remove an installed app.
#[derive(Debug, Args)]
pub struct UninstallCommand {
    /// App to remove
    pub name: String,

    /// Keep the app's backups for a later rollback
    #[arg(long)]
    pub keep_backups: bool,
}

impl UninstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let outcome = engine
            .uninstall(&self.name, self.keep_backups)
            .await
            .with_context(|| format!("Failed to uninstall {}", self.name))?;

        println!("{} Uninstalled {} {}", "✓".green(), outcome.name.bold(), outcome.version);
        if !outcome.artifact_removed {
            println!("  {}", "The artifact was already missing".yellow());
        }
        if let Some(removed) = outcome.backups_removed
            && removed.files > 0
        {
            println!("  Removed {} backup file(s), {}", removed.files, format_bytes(removed.bytes));
        }
        Ok(CommandOutcome::Success)
    }
}
