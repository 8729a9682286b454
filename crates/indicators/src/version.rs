use crate::sync::SyncError;

/// Fetches the published version identifier of the remote indicator set.
#[async_trait::async_trait]
pub trait VersionSource: Send + Sync {
    /// Returns the trimmed body found at `url`.
    async fn fetch_remote_version(&self, url: &str) -> Result<String, SyncError>;
}

/// True when the installed indicator set differs from the remote one.
///
/// Versions are compared after trimming, exactly and case-sensitively.
/// A missing local version always needs a sync.
pub fn needs_sync(local: Option<&str>, remote: &str) -> bool {
    match local {
        Some(local) => local.trim() != remote.trim(),
        None => true,
    }
}

/// Normalizes a raw marker body. Empty markers count as absent.
pub fn normalize_version(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
