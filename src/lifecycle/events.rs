//! Progress and result events emitted by lifecycle operations.
//!
//! The engine reports what it is doing through an [`EventSink`]; it never
//! prints. The CLI renders events as progress bars and status lines, tests
//! record them, and library callers that do not care pass [`NullSink`].

use std::sync::Arc;

/// A step of a lifecycle operation for one app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Looking the app up in the catalog and resolving its release.
    Resolving { app: String },
    /// A release was chosen.
    Resolved { app: String, version: String },
    /// Artifact bytes received so far, and the total when known.
    Downloading {
        app: String,
        downloaded: u64,
        total: Option<u64>,
    },
    /// Comparing the artifact digest against the published checksum.
    Verifying { app: String },
    /// The digest matched.
    Verified { app: String, digest: String },
    /// The release publishes no checksum; the artifact is accepted as is.
    Unverified { app: String },
    /// Saving the current artifact into the backup chain.
    BackingUp { app: String, version: String },
    /// Copying a backup back into place.
    Restoring { app: String, version: String },
    /// Renaming the staged artifact over the canonical path.
    Committing { app: String },
    /// Removing the artifact and its registry entry.
    Removing { app: String },
    /// The operation finished for this app.
    Done { app: String, version: String },
}

impl LifecycleEvent {
    /// The app the event is about.
    #[must_use]
    pub fn app(&self) -> &str {
        match self {
            Self::Resolving { app }
            | Self::Resolved { app, .. }
            | Self::Downloading { app, .. }
            | Self::Verifying { app }
            | Self::Verified { app, .. }
            | Self::Unverified { app }
            | Self::BackingUp { app, .. }
            | Self::Restoring { app, .. }
            | Self::Committing { app }
            | Self::Removing { app }
            | Self::Done { app, .. } => app,
        }
    }

    /// Short phase name for display.
    #[must_use]
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::Resolving { .. } => "resolving",
            Self::Resolved { .. } => "resolved",
            Self::Downloading { .. } => "downloading",
            Self::Verifying { .. } => "verifying",
            Self::Verified { .. } => "verified",
            Self::Unverified { .. } => "unverified",
            Self::BackingUp { .. } => "backing up",
            Self::Restoring { .. } => "restoring",
            Self::Committing { .. } => "committing",
            Self::Removing { .. } => "removing",
            Self::Done { .. } => "done",
        }
    }

    /// Download percentage, when the total is known.
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Downloading {
                downloaded,
                total: Some(total),
                ..
            } if *total > 0 => Some(((downloaded.min(total) * 100) / total) as u8),
            _ => None,
        }
    }
}

/// Receiver of lifecycle events.
pub trait EventSink: Send + Sync {
    /// Handle one event. Must not fail or block for long.
    fn emit(&self, event: LifecycleEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LifecycleEvent) {}
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: LifecycleEvent) {
        (**self).emit(event);
    }
}
