//! Shared context and rendering helpers for CLI commands.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::GlobalArgs;
use crate::config::{GlobalConfig, InstallLayout, resolve_root};
use crate::constants::{CONFIG_FILE_NAME, ROOT_ENV_VAR};
use crate::fetch::Verification;
use crate::lifecycle::{BatchOptions, BatchOutcome, BatchReport, EventSink, LifecycleEngine, LifecycleEvent};
use crate::transport::GitHubTransport;
use crate::utils::ProgressBar;

/// How a command finished when it did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Everything succeeded.
    Success,
    /// A batch finished but at least one item failed.
    PartialFailure,
}

impl CommandOutcome {
    /// Process exit code.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::PartialFailure => 2,
        }
    }
}

/// Everything a command needs: configuration, layout and remote.
pub struct CommandContext {
    /// Loaded configuration
    pub config: GlobalConfig,
    /// Where the configuration was read from
    pub config_path: PathBuf,
    /// Install layout in effect
    pub layout: InstallLayout,
    /// Whether progress bars are drawn
    pub progress: bool,
}

impl CommandContext {
    /// Resolve the root, load its configuration and build the layout.
    ///
    /// The configuration is read from the root chosen by `--root` or
    /// `CMAM_ROOT` (or the platform default); its `install_root` key can
    /// then move the install root elsewhere.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is malformed or no root can be found.
    pub async fn load(globals: &GlobalArgs) -> Result<Self> {
        let env_root = std::env::var(ROOT_ENV_VAR).ok();
        let config_root = resolve_root(globals.root.as_deref(), env_root.as_deref(), None)?;
        let config_path = config_root.join(CONFIG_FILE_NAME);
        let config = GlobalConfig::load_from(&config_path).await?;

        let root =
            resolve_root(globals.root.as_deref(), env_root.as_deref(), config.expanded_install_root())?;
        let layout = InstallLayout::new(root, config.artifact_suffix.clone());
        tracing::debug!("Install root: {}", layout.root().display());

        Ok(Self {
            config,
            config_path,
            layout,
            progress: !globals.no_progress && io::stderr().is_terminal(),
        })
    }

    /// Remote built from the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn remote(&self) -> Result<GitHubTransport> {
        GitHubTransport::from_config(&self.config).context("Failed to set up the HTTP client")
    }

    /// Engine over the configured root, rendering events to the terminal.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn engine(&self) -> Result<LifecycleEngine<GitHubTransport>> {
        Ok(LifecycleEngine::new(self.remote()?, self.layout.clone())
            .with_sink(Arc::new(ProgressSink::new(self.progress))))
    }

    /// Batch options from configuration, with CLI overrides.
    #[must_use]
    pub fn batch_options(&self, no_backup: bool, fail_fast: bool) -> BatchOptions {
        BatchOptions {
            skip_on_error: self.config.lifecycle.skip_on_error && !fail_fast,
            keep_backups: self.config.lifecycle.keep_backups && !no_backup,
        }
    }
}

/// Renders lifecycle events as progress bars and status lines on stderr.
pub struct ProgressSink {
    enabled: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressSink {
    /// Sink that draws bars only when `enabled`.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            bar: Mutex::new(None),
        }
    }

    fn clear_bar(&self) {
        if let Ok(mut bar) = self.bar.lock()
            && let Some(bar) = bar.take()
        {
            bar.finish_and_clear();
        }
    }
}

impl EventSink for ProgressSink {
    fn emit(&self, event: LifecycleEvent) {
        match &event {
            LifecycleEvent::Resolving { app } => {
                tracing::debug!("Resolving {}", app);
            }
            LifecycleEvent::Downloading {
                app,
                downloaded,
                total,
            } => {
                if let Ok(mut slot) = self.bar.lock() {
                    let bar = slot.get_or_insert_with(|| {
                        let bar = ProgressBar::download(self.enabled, *total);
                        bar.set_prefix(app.clone());
                        bar.set_message("downloading");
                        bar
                    });
                    bar.set_position(*downloaded);
                }
            }
            LifecycleEvent::Verifying { .. } => self.clear_bar(),
            LifecycleEvent::Unverified { app } => {
                eprintln!(
                    "{} {} publishes no checksum; installed without verification",
                    "warning:".yellow().bold(),
                    app
                );
            }
            LifecycleEvent::BackingUp { app, version } => {
                eprintln!("  {} {} {}", "Backing up".cyan(), app, version);
            }
            LifecycleEvent::Restoring { app, version } => {
                eprintln!("  {} {} {}", "Restoring".cyan(), app, version);
            }
            _ => {}
        }
    }
}

impl Drop for ProgressSink {
    fn drop(&mut self) {
        self.clear_bar();
    }
}

/// Short suffix noting an unverified artifact.
#[must_use]
pub fn verification_note(verification: Verification) -> String {
    match verification {
        Verification::Verified => String::new(),
        Verification::Unverified => format!(" {}", "(unverified)".yellow()),
    }
}

/// Print a batch report and turn it into a command outcome.
pub fn print_batch_report(report: &BatchReport, verb: &str) -> CommandOutcome {
    if report.items.is_empty() {
        println!("Nothing to {verb}.");
        return CommandOutcome::Success;
    }

    for item in &report.items {
        let line = match &item.outcome {
            BatchOutcome::Installed { version } => {
                format!("{} {} {}", "✓".green(), item.name, version)
            }
            BatchOutcome::Updated { from, to } => {
                format!("{} {} {} → {}", "✓".green(), item.name, from, to)
            }
            BatchOutcome::UpToDate { version } => {
                format!("{} {} {} (up to date)", "•".dimmed(), item.name, version)
            }
            BatchOutcome::Failed { kind, message } => {
                format!("{} {} [{}] {}", "✗".red(), item.name, kind, message)
            }
            BatchOutcome::NotAttempted => {
                format!("{} {} (not attempted)", "-".dimmed(), item.name)
            }
        };
        println!("{line}");
    }

    println!();
    let summary = format!(
        "{} succeeded, {} failed",
        report.success_count(),
        report.failure_count()
    );
    if report.has_failures() {
        println!("{}", summary.red());
        CommandOutcome::PartialFailure
    } else {
        println!("{}", summary.green());
        CommandOutcome::Success
    }
}

/// Ask a yes/no question on the terminal. Defaults to no, and to no when
/// stdin is not a terminal.
///
/// # Errors
///
/// Fails if stdin or stdout cannot be used.
pub async fn confirm(question: &str) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(false);
    }

    print!("{} {} ", question.yellow(), "[y/N]:".dimmed());
    io::stdout().flush()?;

    let mut reader = BufReader::new(tokio::io::stdin());
    let mut response = String::new();
    reader.read_line(&mut response).await?;
    let response = response.trim().to_lowercase();
    Ok(response == "y" || response == "yes")
}
