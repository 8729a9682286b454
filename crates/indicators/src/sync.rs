use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;

/// Errors that can occur during a sync pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("remote listing error: {0}")]
    RemoteList(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("a sync pass is already in progress")]
    Busy,
}

impl SyncError {
    /// Stable machine-readable code, used on the gateway wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::RemoteList(_) => "remote-list",
            Self::Storage(_) => "storage",
            Self::Busy => "busy",
        }
    }
}

/// Owner/repo/branch triple identifying the remote indicator tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoCoordinates {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// The built-in source used by the automatic sync.
    pub fn defaults() -> Self {
        Self::new(
            constants::DEFAULT_OWNER,
            constants::DEFAULT_REPO,
            constants::DEFAULT_BRANCH,
        )
    }
}

/// Caller-supplied parameters for one download pass.
///
/// Every field is optional on the wire; missing owner or repo is rejected
/// by the orchestrator rather than during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadOptions {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl DownloadOptions {
    pub fn for_coordinates(coords: &RepoCoordinates) -> Self {
        Self {
            owner: Some(coords.owner.clone()),
            repo: Some(coords.repo.clone()),
            branch: Some(coords.branch.clone()),
            token: None,
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// A single file that could not be fetched or written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: String,
    pub error: String,
}

/// Outcome of one sync pass.
///
/// `success` describes the pass as a whole; individual file failures are
/// listed in `errors` and do not flip it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub downloaded_count: usize,
    pub errors: Vec<FileError>,
    pub directory: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    /// A pass that aborted before downloading anything.
    pub fn failed(directory: PathBuf, error: &SyncError) -> Self {
        Self {
            success: false,
            downloaded_count: 0,
            errors: Vec::new(),
            directory,
            error: Some(error.to_string()),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.success && !self.errors.is_empty()
    }
}
