use serde::Deserialize;

/// Response from GitHub's Contents API.
/// `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}`
#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    pub content: Option<String>,
    pub encoding: Option<String>,
}
