//! `cmam repair <app>`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome, verification_note};

/// Reinstall an app at its recorded version.
#[derive(Debug, Args)]
pub struct RepairCommand {
    /// App to repair
    pub name: String,
}

impl RepairCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let outcome = engine
            .repair(&self.name)
            .await
            .with_context(|| format!("Failed to repair {}", self.name))?;

        println!(
            "{} Repaired {} {}{}",
            "✓".green(),
            outcome.name.bold(),
            outcome.version,
            verification_note(outcome.verification)
        );
        Ok(CommandOutcome::Success)
    }
}
