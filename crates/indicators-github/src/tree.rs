use indicators::RemoteTreeEntry;
use serde::Deserialize;

/// Response from GitHub's Git Trees API.
/// `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1`
///
/// Every field is optional so error bodies (`{"message": ...}`) still
/// parse; a missing `tree` is reported by the caller.
#[derive(Debug, Deserialize)]
pub struct TreeResponse {
    #[serde(default)]
    pub tree: Option<Vec<RemoteTreeEntry>>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub message: Option<String>,
}
