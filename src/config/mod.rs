//! Configuration and install-root layout.
//!
//! - [`global`]: the user's `config.toml` ([`GlobalConfig`])
//! - [`layout`]: paths under the install root ([`InstallLayout`]) and root
//!   resolution (`--root` > `CMAM_ROOT` > `install_root` > platform default)

pub mod global;
pub mod layout;

pub use global::{GlobalConfig, LifecycleConfig, SETTABLE_KEYS, expand_path};
pub use layout::{InstallLayout, resolve_root};
