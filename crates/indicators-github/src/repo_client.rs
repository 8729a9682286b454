use std::time::Duration;

use base64::Engine;
use reqwest::Url;

use indicators::constants::{CONTENT_TIMEOUT, GITHUB_API_BASE, LIST_TIMEOUT};
use indicators::path::filter_indicator_entries;
use indicators::{RemoteRepository, RemoteTreeEntry, RepoCoordinates, SyncError};

use crate::content::ContentResponse;
use crate::http;
use crate::tree::TreeResponse;

/// Lists and fetches indicator files through the GitHub REST API.
pub struct GitHubRepoClient {
    client: reqwest::Client,
    api_base_url: Option<String>,
    list_timeout: Duration,
    content_timeout: Duration,
}

impl GitHubRepoClient {
    pub fn new(api_base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url,
            list_timeout: LIST_TIMEOUT,
            content_timeout: CONTENT_TIMEOUT,
        }
    }

    /// Override the per-request timeouts for listing and content fetches.
    pub fn with_timeouts(mut self, list: Duration, content: Duration) -> Self {
        self.list_timeout = list;
        self.content_timeout = content;
        self
    }

    fn api_base(&self) -> &str {
        self.api_base_url
            .as_deref()
            .unwrap_or(GITHUB_API_BASE)
            .trim_end_matches('/')
    }

    /// API URL with each segment percent-encoded, so `#`, `?` and `%` in
    /// repository paths stay part of the path.
    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, SyncError> {
        let mut url = Url::parse(self.api_base())
            .map_err(|e| SyncError::Configuration(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SyncError::Configuration("API base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn tree_url(&self, coords: &RepoCoordinates) -> Result<Url, SyncError> {
        let mut url = self.endpoint(
            ["repos", coords.owner.as_str(), coords.repo.as_str(), "git", "trees"]
                .into_iter()
                .chain(coords.branch.split('/')),
        )?;
        url.query_pairs_mut().append_pair("recursive", "1");
        Ok(url)
    }

    fn content_url(&self, coords: &RepoCoordinates, path: &str) -> Result<Url, SyncError> {
        let mut url = self.endpoint(
            ["repos", coords.owner.as_str(), coords.repo.as_str(), "contents"]
                .into_iter()
                .chain(path.split('/')),
        )?;
        url.query_pairs_mut().append_pair("ref", &coords.branch);
        Ok(url)
    }
}

/// Decode a Contents API payload according to its declared encoding.
pub fn decode_content(response: &ContentResponse) -> Result<Vec<u8>, SyncError> {
    let payload = response
        .content
        .as_deref()
        .ok_or_else(|| SyncError::Network("no content in response".into()))?;

    match response.encoding.as_deref().unwrap_or("base64") {
        "base64" => {
            // GitHub returns base64 with newlines embedded
            let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

            base64::engine::general_purpose::STANDARD
                .decode(&cleaned)
                .map_err(|e| SyncError::Network(format!("base64 decode failed: {e}")))
        }
        "utf-8" | "utf8" => Ok(payload.as_bytes().to_vec()),
        other => Err(SyncError::Network(format!(
            "unsupported content encoding: {other}"
        ))),
    }
}

#[async_trait::async_trait]
impl RemoteRepository for GitHubRepoClient {
    async fn list_indicator_blobs(
        &self,
        coords: &RepoCoordinates,
        token: Option<&str>,
    ) -> Result<Vec<RemoteTreeEntry>, SyncError> {
        let url = self.tree_url(coords)?;

        let response = http::get(&self.client, url, token)
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| http::transport_error("tree listing", &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http::transport_error("tree listing body", &e))?;

        let parsed: TreeResponse = serde_json::from_str(&body).map_err(|e| {
            SyncError::RemoteList(format!("HTTP {status}: malformed tree response: {e}"))
        })?;

        let Some(tree) = parsed.tree else {
            let detail = parsed.message.unwrap_or_else(|| "missing tree field".into());
            return Err(SyncError::RemoteList(format!("HTTP {status}: {detail}")));
        };

        if parsed.truncated {
            tracing::warn!(
                owner = %coords.owner,
                repo = %coords.repo,
                "tree response was truncated; results may be incomplete"
            );
        }

        let listed = tree.len();
        let entries = filter_indicator_entries(tree);

        tracing::debug!(listed, kept = entries.len(), "filtered remote tree");

        Ok(entries)
    }

    async fn fetch_blob_content(
        &self,
        coords: &RepoCoordinates,
        path: &str,
        token: Option<&str>,
    ) -> Result<Vec<u8>, SyncError> {
        let url = self.content_url(coords, path)?;

        let response = http::get(&self.client, url, token)
            .timeout(self.content_timeout)
            .send()
            .await
            .map_err(|e| http::transport_error(path, &e))?;

        if !response.status().is_success() {
            return Err(SyncError::Network(format!(
                "HTTP {} fetching {path}",
                response.status()
            )));
        }

        let content_response: ContentResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("invalid content response for {path}: {e}")))?;

        decode_content(&content_response)
    }
}
