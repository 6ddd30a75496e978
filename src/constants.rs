//! Global constants used throughout the CMAM codebase.
//!
//! Default endpoints, file names, and thresholds shared by the library and
//! the CLI live here so they are discoverable in one place.

use std::time::Duration;

/// Default catalog location: the `packages.json` of the CMAM catalog repository.
pub const DEFAULT_CATALOG_URL: &str =
    "https://api.github.com/repos/cmerk2021/cmam/contents/packages.json";

/// Default REST API base used for release lookups and reachability checks.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Repository that publishes CMAM's own releases.
pub const DEFAULT_SELF_REPOSITORY: &str = "cmerk2021/cmam";

/// Executable suffix of distributed artifacts.
pub const DEFAULT_ARTIFACT_SUFFIX: &str = ".exe";

/// Name of the manager's own binary, without suffix.
pub const MANAGER_BINARY_NAME: &str = "cmam";

/// Extension the replaced manager binary is renamed to during a Windows
/// self-update.
pub const MANAGER_ASIDE_EXTENSION: &str = "old";

/// Environment variable overriding the install root.
pub const ROOT_ENV_VAR: &str = "CMAM_ROOT";

/// Environment variable carrying an optional API token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Registry file name under the install root.
pub const REGISTRY_FILE_NAME: &str = "registry.toml";

/// Configuration file name under the install root.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Extension of in-flight staging files.
pub const STAGING_SUFFIX: &str = ".part";

/// Free-space floor below which doctor reports a low-space warning (1 GiB).
pub const MIN_FREE_SPACE_BYTES: u64 = 1_073_741_824;

/// Timeout for a single API request (catalog, release metadata, ping).
pub const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing a connection before an artifact download starts.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Number of attempts when moving a backup into place on a busy filesystem.
pub const BACKUP_RESTORE_ATTEMPTS: u32 = 3;

/// Delay between backup restore attempts.
pub const BACKUP_RESTORE_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Maximum edit distance for a "did you mean" suggestion.
pub const SUGGESTION_MAX_DISTANCE: usize = 3;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("cmam/", env!("CARGO_PKG_VERSION"));
