//! `cmam search [query]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome};
use crate::catalog::CatalogEntry;

/// Search the catalog by name and description.
#[derive(Debug, Args)]
pub struct SearchCommand {
    /// Case-insensitive text to look for; omit to list the whole catalog
    pub query: Option<String>,
}

impl SearchCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let catalog = engine.fetch_catalog().await.context("Failed to fetch the catalog")?;
        let registry = engine.load_registry().await?;

        let matches: Vec<&CatalogEntry> = match self.query.as_deref() {
            Some(query) => catalog.search(query),
            None => catalog.iter().collect(),
        };
        if matches.is_empty() {
            println!("No apps found.");
            return Ok(CommandOutcome::Success);
        }

        for entry in matches {
            let installed = registry
                .version_of(&entry.name)
                .map(|v| format!(" [installed {v}]").green().to_string())
                .unwrap_or_default();
            println!("{}{}", entry.name.bold(), installed);
            if let Some(description) = &entry.description {
                println!("  {}", description.dimmed());
            }
        }
        Ok(CommandOutcome::Success)
    }
}
