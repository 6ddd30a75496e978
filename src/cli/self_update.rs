//! `cmam self-update [--version V] [--check] [--force]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome, ProgressSink, verification_note};
use crate::lifecycle::{SelfUpdateOptions, SelfUpdateOutcome, SelfUpdater};

/// Update the running cmam binary.
#[derive(Debug, Args)]
pub struct SelfUpdateCommand {
    /// Install this version instead of the latest
    #[arg(long = "version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Only report whether an update is available
    #[arg(long)]
    pub check: bool,

    /// Reinstall even when already up to date
    #[arg(long)]
    pub force: bool,
}

impl SelfUpdateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let updater = SelfUpdater::for_current_exe(
            ctx.config.self_repository.clone(),
            ctx.config.artifact_suffix.clone(),
        )?;
        let remote = ctx.remote()?;
        let options = SelfUpdateOptions {
            target_version: self.version,
            check_only: self.check,
            force: self.force,
        };

        let outcome = updater
            .run(&remote, &options, &ProgressSink::new(ctx.progress))
            .await
            .context("Self-update failed")?;

        match outcome {
            SelfUpdateOutcome::UpToDate { current } => {
                println!("cmam {current} is up to date.");
            }
            SelfUpdateOutcome::Available { current, latest } => {
                println!(
                    "Update available: {} → {}. Run 'cmam self-update' to install it.",
                    current,
                    latest.green()
                );
            }
            SelfUpdateOutcome::Updated {
                from,
                to,
                verification,
            } => {
                println!(
                    "{} Updated cmam {} → {}{}",
                    "✓".green(),
                    from,
                    to,
                    verification_note(verification)
                );
            }
        }
        Ok(CommandOutcome::Success)
    }
}
