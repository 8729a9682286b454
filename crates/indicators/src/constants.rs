//! Fixed identifiers and tunables for the indicator sync subsystem.

use std::time::Duration;

/// Plain-text version marker published alongside the indicator repository.
pub const REMOTE_VERSION_URL: &str =
    "https://raw.githubusercontent.com/indicator-hub/indicators/main/indicator_version";

pub const DEFAULT_OWNER: &str = "indicator-hub";
pub const DEFAULT_REPO: &str = "indicators";
pub const DEFAULT_BRANCH: &str = "main";

pub const GITHUB_API_BASE: &str = "https://api.github.com";
pub const USER_AGENT: &str = "indicator-sync";

/// How often the automatic sync checks the remote version marker.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Only repository paths under this prefix are mirrored.
pub const INDICATOR_PREFIX: &str = "indicators/";
/// Compared against the lowercased path.
pub const INDICATOR_EXTENSION: &str = ".json";

/// Name of the marker file at the store root.
pub const VERSION_MARKER_FILE: &str = "indicator_version";

pub const LIST_TIMEOUT: Duration = Duration::from_secs(20);
pub const VERSION_TIMEOUT: Duration = Duration::from_secs(15);
pub const CONTENT_TIMEOUT: Duration = LIST_TIMEOUT;

pub const KEYRING_SERVICE: &str = "indicator-sync";
pub const KEYRING_ACCOUNT: &str = "github-token";

/// Store directory placed next to the executable in production builds.
pub const PORTABLE_DIR_NAME: &str = "indicator-data";
/// Store directory under the per-user data directory.
pub const APP_DIR_NAME: &str = "indicator-sync";
