//! Error handling for CMAM.
//!
//! [`CmamError`] enumerates every failure the package lifecycle can produce.
//! Variants are grouped into the categories described by [`ErrorKind`], which
//! the CLI uses to pick a distinguishable exit code and batch operations use
//! to tally per-item failures.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cmam_cli::core::{CmamError, ErrorKind};
//!
//! let error = CmamError::NotInstalled { name: "foo".to_string() };
//! assert_eq!(error.kind(), ErrorKind::State);
//! assert_eq!(error.kind().exit_code(), 6);
//! ```

use colored::Colorize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = CmamError> = std::result::Result<T, E>;

/// Category of a [`CmamError`].
///
/// Categories are stable and user-visible: each maps to its own process exit
/// code so scripts can tell a network hiccup from a checksum failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network or remote payload failure. Never retried internally.
    Transport,
    /// Expected absence of an app, release, backup or artifact.
    NotFound,
    /// Checksum mismatch or unverifiable digest format.
    Integrity,
    /// Lifecycle precondition violation (already installed, not installed, ...).
    State,
    /// Malformed local registry or configuration file.
    Config,
    /// Local filesystem failure.
    Io,
    /// Anything else.
    Other,
}

impl ErrorKind {
    /// Process exit code for a command that failed with this kind of error.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Transport => 3,
            Self::NotFound => 4,
            Self::Integrity => 5,
            Self::State => 6,
            Self::Config => 7,
            Self::Io | Self::Other => 1,
        }
    }

    /// Short lowercase label used in batch summaries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::NotFound => "not-found",
            Self::Integrity => "integrity",
            Self::State => "state",
            Self::Config => "config",
            Self::Io => "io",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every failure mode of the CMAM library.
#[derive(Error, Debug)]
pub enum CmamError {
    /// A network request failed or returned an unexpected status.
    #[error("Network error while {operation}: {message}")]
    Transport {
        /// What was being attempted (e.g. "fetching release", "downloading artifact")
        operation: String,
        /// Transport-level description of the failure
        message: String,
    },

    /// The remote catalog could not be fetched.
    #[error("Catalog is unavailable: {reason}")]
    CatalogUnavailable {
        /// Why the catalog could not be fetched
        reason: String,
    },

    /// The remote catalog was fetched but its payload could not be parsed.
    #[error("Catalog payload is malformed: {reason}")]
    CatalogMalformed {
        /// Parser error description
        reason: String,
    },

    /// The catalog has no entry with this exact name.
    #[error("App '{name}' not found in catalog")]
    AppNotInCatalog {
        /// Requested application name
        name: String,
        /// Closest catalog name, if any is similar enough
        suggestion: Option<String>,
    },

    /// The source has no release matching the request.
    #[error("No release found for '{locator}' ({})", .tag.as_deref().unwrap_or("latest"))]
    ReleaseNotFound {
        /// Source locator, e.g. `owner/repo`
        locator: String,
        /// Requested tag, or `None` for the latest release
        tag: Option<String>,
    },

    /// The release exists but has no asset with the artifact suffix.
    #[error("No '{suffix}' artifact found in release {tag} of '{locator}'")]
    NoArtifactFound {
        /// Source locator
        locator: String,
        /// Release tag that was inspected
        tag: String,
        /// Artifact suffix that was searched for
        suffix: String,
    },

    /// No backup exists for the requested version.
    #[error("No backup of '{name}' at version {version}")]
    BackupNotFound {
        /// Application name
        name: String,
        /// Requested backup version
        version: String,
    },

    /// The backup chain holds nothing for this application.
    #[error("No backups available for '{name}'")]
    NoBackupsAvailable {
        /// Application name
        name: String,
    },

    /// The downloaded digest differs from the release's expected checksum.
    #[error("Checksum mismatch for '{name}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Application name
        name: String,
        /// Expected tagged digest
        expected: String,
        /// Computed tagged digest
        actual: String,
    },

    /// The release advertised a checksum in a format that cannot be verified.
    #[error("Unsupported checksum '{checksum}' for '{name}'")]
    UnsupportedChecksum {
        /// Application name
        name: String,
        /// The checksum string as published
        checksum: String,
    },

    /// Install was requested for an app that already has a registry entry.
    #[error("'{name}' is already installed (version {version})")]
    AlreadyInstalled {
        /// Application name
        name: String,
        /// Installed version
        version: String,
    },

    /// The operation requires a registry entry that does not exist.
    #[error("'{name}' is not installed")]
    NotInstalled {
        /// Application name
        name: String,
    },

    /// A pinned request resolved to a release with a different version.
    #[error("Requested version {requested} of '{name}' but the release is tagged {resolved}")]
    VersionMismatch {
        /// Application name
        name: String,
        /// Version the user asked for
        requested: String,
        /// Version carried by the resolved release
        resolved: String,
    },

    /// A version string does not match `major.minor.patch[-alpha|beta|rc]`.
    #[error("Invalid version format: '{version}'")]
    InvalidVersionFormat {
        /// The offending string
        version: String,
    },

    /// The local registry file exists but cannot be parsed.
    #[error("Invalid registry file {path}: {reason}")]
    RegistryParse {
        /// Registry file path
        path: String,
        /// Parser error description
        reason: String,
    },

    /// Local configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// A filesystem operation on a known path failed.
    #[error("Failed to {operation} {path}: {source}")]
    FileSystem {
        /// Operation that failed, phrased as a verb ("create", "rename", ...)
        operation: String,
        /// Path involved
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// IO error without path context.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl CmamError {
    /// The taxonomy category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } | Self::CatalogUnavailable { .. } | Self::CatalogMalformed { .. } => {
                ErrorKind::Transport
            }
            Self::AppNotInCatalog { .. }
            | Self::ReleaseNotFound { .. }
            | Self::NoArtifactFound { .. }
            | Self::BackupNotFound { .. }
            | Self::NoBackupsAvailable { .. } => ErrorKind::NotFound,
            Self::ChecksumMismatch { .. } | Self::UnsupportedChecksum { .. } => {
                ErrorKind::Integrity
            }
            Self::AlreadyInstalled { .. }
            | Self::NotInstalled { .. }
            | Self::VersionMismatch { .. }
            | Self::InvalidVersionFormat { .. } => ErrorKind::State,
            Self::RegistryParse { .. } | Self::Config { .. } => ErrorKind::Config,
            Self::FileSystem { .. } | Self::Io(_) => ErrorKind::Io,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Build a [`CmamError::Transport`].
    pub fn transport(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Build a [`CmamError::FileSystem`] for `path`.
    pub fn fs(operation: impl Into<String>, path: &Path, source: std::io::Error) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.display().to_string(),
            source,
        }
    }
}

/// User-facing rendering of an error with optional details and suggestion.
///
/// Produced by [`user_friendly_error`] at the CLI boundary and printed with
/// [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The primary error message
    pub message: String,
    /// Category used to choose the exit code
    pub kind: ErrorKind,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Exit code for the process.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Print the error to stderr: message in red, details in yellow,
    /// suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// The error chain is searched for a [`CmamError`]; when one is found its
/// category drives the exit code and a tailored suggestion is attached. Other
/// errors are rendered with their full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let outer = error.to_string();

    if let Some(cmam_error) = error.chain().find_map(|cause| cause.downcast_ref::<CmamError>()) {
        let mut context = create_error_context(cmam_error);
        if outer != cmam_error.to_string() {
            // Keep the command-level context ("Failed to install foo") in front.
            context.details = Some(match context.details.take() {
                Some(details) => format!("{outer}\n{details}"),
                None => outer,
            });
        }
        return context;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(error.to_string(), ErrorKind::Io)
            .with_suggestion(
                "Check that you own the install root or run with elevated permissions",
            );
    }

    let mut message = outer;
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(message, ErrorKind::Other)
}

fn create_error_context(error: &CmamError) -> ErrorContext {
    let context = ErrorContext::new(error.to_string(), error.kind());
    match error {
        CmamError::Transport { .. } | CmamError::CatalogUnavailable { .. } => context
            .with_suggestion("Check your network connection and try again")
            .with_details("CMAM never retries network requests automatically"),
        CmamError::CatalogMalformed { .. } => context
            .with_suggestion("Check the catalog_url in your config; the remote catalog may be broken")
            .with_details("The catalog must be a JSON object mapping app names to {\"link\": \"owner/repo\"}"),
        CmamError::AppNotInCatalog { suggestion, .. } => match suggestion {
            Some(name) => context.with_suggestion(format!("Did you mean '{name}'?")),
            None => context.with_suggestion("Run 'cmam search' to see available apps"),
        },
        CmamError::ReleaseNotFound { tag: Some(_), .. } => context
            .with_suggestion("Run 'cmam info <app>' to see the latest available version"),
        CmamError::NoArtifactFound { .. } => context
            .with_details("The release does not publish a binary for this platform"),
        CmamError::NoBackupsAvailable { .. } => context
            .with_details("Backups are created by 'cmam update' and 'cmam rollback'"),
        CmamError::BackupNotFound { name, .. } => {
            context.with_suggestion(format!("Run 'cmam rollback {name}' to list available backups"))
        }
        CmamError::ChecksumMismatch { .. } | CmamError::UnsupportedChecksum { .. } => context
            .with_details("The downloaded file was discarded; nothing was installed")
            .with_suggestion("Retry later; if this persists, report it to the app's maintainer"),
        CmamError::AlreadyInstalled { name, .. } => {
            context.with_suggestion(format!("Use 'cmam update {name}' to change versions"))
        }
        CmamError::NotInstalled { name } => {
            context.with_suggestion(format!("Use 'cmam install {name}' first"))
        }
        CmamError::RegistryParse { .. } => context
            .with_suggestion("Fix or remove the registry file, then run 'cmam doctor'"),
        CmamError::Config { .. } => {
            context.with_suggestion("Run 'cmam config show' to inspect the active configuration")
        }
        _ => context,
    }
}
