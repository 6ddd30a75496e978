//! `cmam config show|path|set`
//!
//! ```bash
//! cmam config                      # same as show
//! cmam config path
//! cmam config set lifecycle.keep_backups false
//! cmam config set install_root ""  # clear the override
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use super::common::{CommandContext, CommandOutcome};
use crate::config::SETTABLE_KEYS;

/// Show or change configuration.
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommands {
    /// Print the active configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Set one key and save
    Set {
        /// Key, e.g. `lifecycle.skip_on_error`
        key: String,
        /// New value
        value: String,
    },
}

impl ConfigCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        match self.command.unwrap_or(ConfigSubcommands::Show) {
            ConfigSubcommands::Show => {
                println!("{}", format!("# {}", ctx.config_path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&ctx.config)?);
                println!("{}", format!("# install root in effect: {}", ctx.layout.root().display()).dimmed());
            }
            ConfigSubcommands::Path => println!("{}", ctx.config_path.display()),
            ConfigSubcommands::Set { key, value } => {
                let mut config = ctx.config.clone();
                config.set(&key, &value).with_context(|| {
                    format!("Cannot set '{key}'. Settable keys: {}", SETTABLE_KEYS.join(", "))
                })?;
                config
                    .save_to(&ctx.config_path)
                    .await
                    .with_context(|| format!("Failed to write {}", ctx.config_path.display()))?;
                println!("{} {} = {}", "✓".green(), key, value);
            }
        }
        Ok(CommandOutcome::Success)
    }
}
