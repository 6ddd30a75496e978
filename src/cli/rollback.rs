//! `cmam rollback <app> [version]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome};
use crate::backup::Backup;
use crate::lifecycle::RollbackOutcome;

/// List backups of an app, or restore one.
#[derive(Debug, Args)]
pub struct RollbackCommand {
    /// App to roll back
    pub name: String,

    /// Backup version to restore; omit to list the available backups
    pub version: Option<String>,
}

impl RollbackCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let outcome = engine
            .rollback(&self.name, self.version.as_deref())
            .await
            .with_context(|| format!("Failed to roll back {}", self.name))?;

        match outcome {
            RollbackOutcome::Listed(backups) => {
                println!("Backups of {}:", self.name.bold());
                print_backups(&backups);
                println!();
                println!("Restore one with 'cmam rollback {} <version>'", self.name);
            }
            RollbackOutcome::RolledBack { from, to } => match from {
                Some(from) => {
                    println!("{} Rolled back {} {} → {}", "✓".green(), self.name.bold(), from, to);
                }
                None => println!("{} Restored {} {}", "✓".green(), self.name.bold(), to),
            },
        }
        Ok(CommandOutcome::Success)
    }
}

/// One line per backup, newest first.
pub fn print_backups(backups: &[Backup]) {
    for backup in backups {
        println!("  {}  {}", backup.version.cyan(), backup.path.display().to_string().dimmed());
    }
}
