//! `cmam backups [app]`

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome};
use super::rollback::print_backups;
use crate::backup::BackupChain;

/// List the backup chain of one app or of every app.
#[derive(Debug, Args)]
pub struct BackupsCommand {
    /// Only this app
    pub name: Option<String>,
}

impl BackupsCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let chain = BackupChain::new(&ctx.layout);
        let apps = match self.name {
            Some(name) => vec![name],
            None => chain.apps().await?,
        };

        let mut any = false;
        for app in apps {
            let backups = chain.list(&app).await?;
            if backups.is_empty() {
                continue;
            }
            any = true;
            println!("{}", app.bold());
            print_backups(&backups);
        }
        if !any {
            println!("No backups.");
        }
        Ok(CommandOutcome::Success)
    }
}
