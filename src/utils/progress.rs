//! Progress indicators for downloads and long-running steps.
//!
//! Thin wrapper over `indicatif` so every bar in the CLI shares one style.
//! Bars are hidden when progress is disabled (`--no-progress` or
//! `CMAM_NO_PROGRESS`), which also keeps output clean in tests and pipes.

use std::time::Duration;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

/// A progress bar or spinner.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Byte-counting bar for a download of `total` bytes, or a spinner when
    /// the total is unknown.
    #[must_use]
    pub fn download(enabled: bool, total: Option<u64>) -> Self {
        if !enabled {
            return Self::hidden();
        }
        match total {
            Some(total) => {
                let bar = IndicatifBar::new(total);
                bar.set_style(download_style());
                Self { inner: bar }
            }
            None => Self::spinner(true),
        }
    }

    /// Spinner that ticks on its own.
    #[must_use]
    pub fn spinner(enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }
        let bar = IndicatifBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { inner: bar }
    }

    /// A bar that draws nothing.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Set the bold prefix (usually the app name).
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        self.inner.set_prefix(prefix.into());
    }

    /// Set the trailing message.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Set the current position.
    pub fn set_position(&self, pos: u64) {
        self.inner.set_position(pos);
    }

    /// Whether the bar has a known length.
    #[must_use]
    pub fn has_length(&self) -> bool {
        self.inner.length().is_some()
    }

    /// Finish and remove the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸━")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{prefix:.bold} {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
}
