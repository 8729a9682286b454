use std::path::{Path, PathBuf};
use std::time::Duration;

use indicators::constants;
use indicators::{RepoCoordinates, SyncSettings};
use serde::{Deserialize, Serialize};

/// Host configuration. Every field has a built-in default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub version_url: String,
    pub poll_interval_secs: u64,
    /// Disable to only sync on explicit request.
    pub auto_sync: bool,
    /// Override for the GitHub API, mainly for mirrors and tests.
    pub api_base_url: Option<String>,
    /// Fixed store location; skips directory resolution.
    pub store_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            owner: constants::DEFAULT_OWNER.into(),
            repo: constants::DEFAULT_REPO.into(),
            branch: constants::DEFAULT_BRANCH.into(),
            version_url: constants::REMOTE_VERSION_URL.into(),
            poll_interval_secs: constants::POLL_INTERVAL.as_secs(),
            auto_sync: true,
            api_base_url: None,
            store_dir: None,
        }
    }
}

impl AppConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin; clamp to one minute.
        Duration::from_secs(self.poll_interval_secs.max(60))
    }

    pub fn coordinates(&self) -> RepoCoordinates {
        RepoCoordinates::new(&self.owner, &self.repo, &self.branch)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            version_url: self.version_url.clone(),
            coordinates: self.coordinates(),
        }
    }
}

/// Config file path: `~/.config/indicator-sync/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(constants::APP_DIR_NAME).join("config.toml"))
}

/// Load config from `path` (or the default location), falling back to
/// defaults if the file is missing or unparseable.
pub fn load_config(path: Option<&Path>) -> AppConfig {
    let path = path.map(Path::to_path_buf).or_else(config_path);

    if let Some(path) = path
        && let Ok(contents) = std::fs::read_to_string(&path)
    {
        match toml::from_str::<AppConfig>(&contents) {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded config");
                return config;
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
            }
        }
    }

    AppConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_come_from_constants() {
        let config = AppConfig::default();
        assert_eq!(config.owner, constants::DEFAULT_OWNER);
        assert_eq!(config.repo, constants::DEFAULT_REPO);
        assert_eq!(config.branch, constants::DEFAULT_BRANCH);
        assert_eq!(config.version_url, constants::REMOTE_VERSION_URL);
        assert_eq!(config.poll_interval(), constants::POLL_INTERVAL);
        assert!(config.auto_sync);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
owner = "my-org"
branch = "develop"
"#,
        )
        .unwrap();

        assert_eq!(config.owner, "my-org");
        assert_eq!(config.branch, "develop");
        assert_eq!(config.repo, constants::DEFAULT_REPO);
        assert_eq!(config.api_base_url, None);
    }

    #[test]
    fn parse_full_toml() {
        let config: AppConfig = toml::from_str(
            r#"
owner = "o"
repo = "r"
branch = "b"
version_url = "https://example.com/v"
poll_interval_secs = 900
auto_sync = false
api_base_url = "https://ghe.example.com/api/v3"
store_dir = "/srv/indicators"
"#,
        )
        .unwrap();

        assert_eq!(config.coordinates(), RepoCoordinates::new("o", "r", "b"));
        assert_eq!(config.poll_interval(), Duration::from_secs(900));
        assert!(!config.auto_sync);
        assert_eq!(config.store_dir, Some(PathBuf::from("/srv/indicators")));
        assert_eq!(config.sync_settings().version_url, "https://example.com/v");
    }

    #[test]
    fn tiny_interval_is_clamped() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml")));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn unparseable_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "owner = [not toml").unwrap();

        assert_eq!(load_config(Some(&path)), AppConfig::default());
    }

    #[test]
    fn file_on_disk_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "repo = \"custom\"\n").unwrap();

        assert_eq!(load_config(Some(&path)).repo, "custom");
    }
}
