//! Shared utilities.
//!
//! - [`fs`] - atomic writes, disk usage and best-effort removal
//! - [`progress`] - progress bars for the CLI

pub mod fs;
pub mod progress;

pub use fs::{atomic_write, disk_usage, format_bytes, remove_dir_all_if_exists, remove_file_if_exists};
pub use progress::ProgressBar;
