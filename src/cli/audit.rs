//! `cmam validate`, `cmam trust`, `cmam doctor` and `cmam clean`.

use anyhow::{Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};

use super::common::{CommandContext, CommandOutcome, confirm};
use crate::audit::{
    CheckStatus, CleanOptions, DoctorOptions, Freed, Health, TrustLevel, ValidationStatus,
};
use crate::platform::ShellProfileRegistrar;
use crate::utils::format_bytes;

fn status_label(status: &ValidationStatus) -> ColoredString {
    let label = format!("{:<8}", status.label());
    match status {
        ValidationStatus::Valid => label.green(),
        ValidationStatus::Invalid(_) => label.red(),
        ValidationStatus::Unknown(_) => label.yellow(),
    }
}

/// Check installed artifacts against published checksums.
#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl ValidateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let report = engine.auditor().validate().await.context("Validation failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.apps.is_empty() {
            println!("No apps installed.");
        } else {
            for app in &report.apps {
                println!(
                    "{} {} {}  {}",
                    status_label(&app.status),
                    app.name.bold(),
                    app.version,
                    app.status.describe().dimmed()
                );
            }
            println!();
            println!(
                "{} valid, {} invalid, {} unknown",
                report.valid_count(),
                report.invalid_count(),
                report.unknown_count()
            );
        }

        Ok(if report.is_clean() {
            CommandOutcome::Success
        } else {
            CommandOutcome::PartialFailure
        })
    }
}

/// Classify installed apps by provenance.
#[derive(Debug, Args)]
pub struct TrustCommand {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl TrustCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let apps = engine.auditor().trust().await.context("Trust check failed")?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&apps)?);
        } else if apps.is_empty() {
            println!("No apps installed.");
        } else {
            for app in &apps {
                let label = match app.trust {
                    TrustLevel::Trusted => app.trust.to_string().green(),
                    TrustLevel::Untrusted => app.trust.to_string().red().bold(),
                    TrustLevel::Unverified | TrustLevel::UnknownSource => {
                        app.trust.to_string().yellow()
                    }
                };
                println!("{} {}  {}", app.name.bold(), app.version, label);
            }
        }

        let untrusted = apps.iter().any(|app| app.trust == TrustLevel::Untrusted);
        Ok(if untrusted { CommandOutcome::PartialFailure } else { CommandOutcome::Success })
    }
}

/// Run health checks on the install root.
#[derive(Debug, Args)]
pub struct DoctorCommand {
    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl DoctorCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let engine = ctx.engine()?;
        let registrar = ShellProfileRegistrar::detect();
        let report = engine.auditor().doctor(&registrar, DoctorOptions::default()).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            for check in &report.checks {
                let mark = match check.status {
                    CheckStatus::Pass => "✓".green(),
                    CheckStatus::Warning => "!".yellow(),
                    CheckStatus::Fail => "✗".red(),
                };
                println!("{} {:<12} {}", mark, check.check, check.message);
            }
            println!();
            match report.health() {
                Health::Healthy => println!("{}", "No problems found.".green()),
                Health::HealthyWithWarnings => println!(
                    "{}",
                    format!("No issues, {} warning(s).", report.warnings().count()).yellow()
                ),
                Health::Unhealthy => println!(
                    "{}",
                    format!("{} issue(s) found.", report.issues().count()).red()
                ),
            }
        }

        Ok(match report.health() {
            Health::Unhealthy => CommandOutcome::PartialFailure,
            Health::Healthy | Health::HealthyWithWarnings => CommandOutcome::Success,
        })
    }
}

/// Remove caches, staging litter, orphaned artifacts and optionally backups.
#[derive(Debug, Args)]
pub struct CleanCommand {
    /// Also delete every backup (asks for confirmation)
    #[arg(long)]
    pub backups: bool,

    /// Do not ask before deleting backups
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl CleanCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let backups_confirmed = self.backups
            && (self.yes
                || confirm("Delete all backups? Rollback will no longer be possible.").await?);
        if self.backups && !backups_confirmed {
            println!("{}", "Keeping backups.".yellow());
        }

        let engine = ctx.engine()?;
        let report = engine
            .auditor()
            .clean(CleanOptions { backups_confirmed })
            .await
            .context("Clean failed")?;

        let line = |label: &str, freed: Freed| {
            println!("  {:<8} {} file(s), {}", label, freed.files, format_bytes(freed.bytes));
        };
        println!("Cleaned:");
        line("cache", report.cache);
        line("staging", report.staging);
        line("orphans", report.orphans);
        if let Some(backups) = report.backups {
            line("backups", backups);
        }
        for name in &report.orphan_names {
            println!("  removed orphan {}", name.dimmed());
        }
        let total = report.total();
        println!("Freed {} in {} file(s).", format_bytes(total.bytes).bold(), total.files);
        Ok(CommandOutcome::Success)
    }
}
