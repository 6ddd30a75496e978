//! `cmam info <app>`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome};
use super::rollback::print_backups;
use crate::release::resolve_release;

/// Show catalog and install details of an app.
#[derive(Debug, Args)]
pub struct InfoCommand {
    /// App name
    pub name: String,
}

impl InfoCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let catalog = engine.fetch_catalog().await.context("Failed to fetch the catalog")?;
        let entry = catalog.resolve(&self.name)?;
        let registry = engine.load_registry().await?;

        println!("{}", entry.name.bold());
        if let Some(description) = &entry.description {
            println!("  {description}");
        }
        println!("  Source:    {}", entry.source_locator);

        match resolve_release(engine.remote(), &entry.source_locator, None).await {
            Ok(release) => println!("  Latest:    {}", release.version()),
            Err(e) => println!("  Latest:    {}", format!("unavailable ({e})").yellow()),
        }

        match registry.get(&entry.name) {
            Some(package) => {
                println!("  Installed: {}", package.version.green());
                println!("  Path:      {}", ctx.layout.artifact_path(&entry.name).display());
            }
            None => println!("  Installed: {}", "no".dimmed()),
        }

        let backups = engine.list_backups(&entry.name).await?;
        if !backups.is_empty() {
            println!("  Backups:");
            print_backups(&backups);
        }
        Ok(CommandOutcome::Success)
    }
}
