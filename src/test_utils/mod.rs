//! Test utilities for CMAM
//!
//! Helpers for exercising the lifecycle engine without a network or a real
//! install root:
//!
//! - [`MockRemote`]: in-memory catalog, releases and artifacts with failure
//!   injection
//! - [`TestRoot`]: a temporary install root with engine construction and
//!   filesystem inspection helpers
//! - [`RecordingSink`]: an event sink that remembers what it saw
//!
//! # Example
//!
//! ```rust,no_run
//! use cmam_cli::test_utils::{MockRemote, TestRoot};
//!
//! # async fn example() -> cmam_cli::core::Result<()> {
//! let remote = MockRemote::new();
//! remote.add_app("foo", "x/foo");
//! remote.publish("x/foo", "1.0.0", b"foo v1");
//!
//! let root = TestRoot::new();
//! let engine = root.engine(remote.clone());
//! engine.install("foo", None).await?;
//! assert_eq!(root.artifact_bytes("foo").as_deref(), Some(&b"foo v1"[..]));
//! # Ok(())
//! # }
//! ```

pub mod environment;
pub mod mock_remote;

pub use environment::{RecordingSink, StaticPathRegistrar, TestRoot};
pub use mock_remote::{ChecksumMode, MockRemote};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` if set; does nothing if
/// neither is provided. Safe to call from every test.
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
