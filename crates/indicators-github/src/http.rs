use indicators::SyncError;
use indicators::constants::USER_AGENT;

pub(crate) fn get(
    client: &reqwest::Client,
    url: impl reqwest::IntoUrl,
    token: Option<&str>,
) -> reqwest::RequestBuilder {
    let mut req = client.get(url).header("User-Agent", USER_AGENT);

    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {token}"));
    }

    req
}

/// Map a transport failure to the sync taxonomy.
pub(crate) fn transport_error(what: &str, e: &reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Timeout(format!("{what}: {e}"))
    } else {
        SyncError::Network(format!("{what} failed: {e}"))
    }
}
