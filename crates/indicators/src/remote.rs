use serde::{Deserialize, Serialize};

use crate::sync::{RepoCoordinates, SyncError};

/// Kind of a remote tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Tree,
    /// Submodules and anything else the remote reports.
    #[serde(other)]
    Other,
}

/// One path in a recursive remote tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

impl RemoteTreeEntry {
    pub fn new(path: impl Into<String>, entry_type: EntryType) -> Self {
        Self {
            path: path.into(),
            entry_type,
        }
    }
}

/// A remote repository holding indicator files.
///
/// The token, when present, must be sent as a bearer credential on every
/// call.
#[async_trait::async_trait]
pub trait RemoteRepository: Send + Sync {
    /// List indicator blobs under the fixed prefix, in remote order.
    async fn list_indicator_blobs(
        &self,
        coords: &RepoCoordinates,
        token: Option<&str>,
    ) -> Result<Vec<RemoteTreeEntry>, SyncError>;

    /// Fetch and decode the raw bytes of one file.
    async fn fetch_blob_content(
        &self,
        coords: &RepoCoordinates,
        path: &str,
        token: Option<&str>,
    ) -> Result<Vec<u8>, SyncError>;
}
