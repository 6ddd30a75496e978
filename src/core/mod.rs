//! Core types shared by every CMAM subsystem.
//!
//! The core module owns the error taxonomy used by the lifecycle engine and
//! its collaborators. Library code returns [`Result`] with a typed
//! [`CmamError`]; the CLI layer wraps those in `anyhow` and converts the final
//! failure into an [`ErrorContext`] for display.
//!
//! # Error Categories
//!
//! Every [`CmamError`] belongs to exactly one [`ErrorKind`]:
//!
//! | Kind | Meaning | Exit code |
//! |------|---------|-----------|
//! | `Transport` | Network or remote payload failure, retryable by the user | 3 |
//! | `NotFound` | Expected absence (app, release, backup, artifact) | 4 |
//! | `Integrity` | Checksum mismatch, always fatal to the operation | 5 |
//! | `State` | Lifecycle precondition violated | 6 |
//! | `Config` | Malformed local registry or configuration | 7 |
//! | `Io` / `Other` | Local filesystem or unexpected failure | 1 |

pub mod error;

pub use error::{CmamError, ErrorContext, ErrorKind, Result, user_friendly_error};
