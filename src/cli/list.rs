//! `cmam list [--json]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::common::{CommandContext, CommandOutcome};
use crate::registry::Registry;

/// List installed apps.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ListedApp {
    name: String,
    version: String,
    installed_at: Option<String>,
    artifact_present: bool,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let registry = Registry::load(&ctx.layout.registry_path())
            .await
            .context("Failed to read the registry")?;

        let apps: Vec<ListedApp> = registry
            .iter()
            .map(|(name, package)| ListedApp {
                name: name.to_string(),
                version: package.version.clone(),
                installed_at: package.installed_at.map(|t| t.to_rfc3339()),
                artifact_present: ctx.layout.artifact_path(name).is_file(),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&apps)?);
            return Ok(CommandOutcome::Success);
        }

        if apps.is_empty() {
            println!("No apps installed.");
            return Ok(CommandOutcome::Success);
        }

        let width = apps.iter().map(|a| a.name.len()).max().unwrap_or(0);
        for app in &apps {
            let marker = if app.artifact_present {
                String::new()
            } else {
                format!("  {}", "(artifact missing)".red())
            };
            println!("{}  {}{}", format!("{:<width$}", app.name).bold(), app.version, marker);
        }
        println!();
        println!("{} app(s) in {}", apps.len(), ctx.layout.root().display());
        Ok(CommandOutcome::Success)
    }
}
