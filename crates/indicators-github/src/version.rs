use std::time::Duration;

use indicators::constants::VERSION_TIMEOUT;
use indicators::{SyncError, VersionSource};

use crate::http;

/// Reads the plain-text version marker published next to the repository.
///
/// The status code is not inspected: whatever body the transport delivers
/// is the version.
pub struct HttpVersionSource {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpVersionSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: VERSION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HttpVersionSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VersionSource for HttpVersionSource {
    async fn fetch_remote_version(&self, url: &str) -> Result<String, SyncError> {
        let response = http::get(&self.client, url, None)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| http::transport_error("version fetch", &e))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), url, "version marker request was not successful");
        }

        let body = response
            .text()
            .await
            .map_err(|e| http::transport_error("version body", &e))?;

        Ok(body.trim().to_owned())
    }
}
