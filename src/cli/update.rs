//! `cmam update <app> [--version V]` and `cmam update --all`

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome, print_batch_report, verification_note};
use crate::lifecycle::UpdateOutcome;

/// Update one app, or every installed app.
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// App to update
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Move to this version (may be older than the installed one)
    #[arg(long = "version", value_name = "VERSION", conflicts_with = "all")]
    pub version: Option<String>,

    /// Update every installed app that has a newer release
    #[arg(long)]
    pub all: bool,

    /// Do not back up the replaced artifact
    #[arg(long)]
    pub no_backup: bool,

    /// With --all, stop at the first failure
    #[arg(long, requires = "all")]
    pub fail_fast: bool,
}

impl UpdateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let options = ctx.batch_options(self.no_backup, self.fail_fast);

        if self.all {
            let report = engine.update_all(options).await.context("Failed to update apps")?;
            return Ok(print_batch_report(&report, "update"));
        }

        let Some(name) = self.name else {
            bail!("Specify an app to update or pass --all");
        };
        let outcome = engine
            .update(&name, self.version.as_deref(), options.keep_backups)
            .await
            .with_context(|| format!("Failed to update {name}"))?;

        match outcome {
            UpdateOutcome::Updated {
                from,
                to,
                backup,
                verification,
            } => {
                println!(
                    "{} Updated {} {} → {}{}",
                    "✓".green(),
                    name.bold(),
                    from,
                    to,
                    verification_note(verification)
                );
                if let Some(backup) = backup {
                    println!("  Previous version kept as backup {}", backup.version);
                }
            }
            UpdateOutcome::UpToDate { version } => {
                println!("{} is already at {}", name.bold(), version);
            }
        }
        Ok(CommandOutcome::Success)
    }
}
