//! `cmam install <app> [--version V]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome, verification_note};

/// Install an app from the catalog.
#[derive(Debug, Args)]
pub struct InstallCommand {
    /// App name as listed in the catalog
    pub name: String,

    /// Install this version instead of the latest release
    #[arg(long = "version", value_name = "VERSION")]
    pub version: Option<String>,
}

impl InstallCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let outcome = engine
            .install(&self.name, self.version.as_deref())
            .await
            .with_context(|| format!("Failed to install {}", self.name))?;

        println!(
            "{} Installed {} {}{}",
            "✓".green(),
            outcome.name.bold(),
            outcome.version,
            verification_note(outcome.verification)
        );
        println!("  {}", ctx.layout.artifact_path(&outcome.name).display().to_string().dimmed());
        Ok(CommandOutcome::Success)
    }
}
