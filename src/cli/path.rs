//! `cmam path [--add]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome};
use crate::platform::{PathRegistrar, PathRegistration, ShellProfileRegistrar};

/// Show whether the bin directory is on PATH, or register it.
#[derive(Debug, Args)]
pub struct PathCommand {
    /// Add the bin directory to PATH for future shells
    #[arg(long)]
    pub add: bool,
}

impl PathCommand {
    pub fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        self.run(ctx, &ShellProfileRegistrar::detect())
    }

    fn run(&self, ctx: &CommandContext, registrar: &dyn PathRegistrar) -> Result<CommandOutcome> {
        let bin = ctx.layout.bin_dir();
        println!("{}", bin.display());

        if !self.add {
            if registrar.is_registered(&bin) {
                println!("{}", "On PATH.".green());
            } else {
                println!("{} Run 'cmam path --add' to register it.", "Not on PATH.".yellow());
            }
            return Ok(CommandOutcome::Success);
        }

        match registrar.register(&bin).context("Failed to register the bin directory")? {
            PathRegistration::AlreadyPresent => println!("{}", "Already on PATH.".green()),
            PathRegistration::Added { profile } => {
                match profile {
                    Some(profile) => {
                        println!("{} Added to {}", "✓".green(), profile.display());
                    }
                    None => println!("{} Added to PATH", "✓".green()),
                }
                println!("Restart your terminal for the change to take effect.");
            }
        }
        Ok(CommandOutcome::Success)
    }
}
