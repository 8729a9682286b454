use std::time::Duration;

use indicators::{SyncError, VersionSource};
use indicators_github::HttpVersionSource;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn version_body_is_trimmed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indicator_version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  2024.06.1\n"))
        .mount(&server)
        .await;

    let source = HttpVersionSource::new();
    let version = source
        .fetch_remote_version(&format!("{}/indicator_version", server.uri()))
        .await
        .unwrap();

    assert_eq!(version, "2024.06.1");
}

#[tokio::test]
async fn non_success_status_still_returns_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indicator_version"))
        .respond_with(ResponseTemplate::new(404).set_body_string("404: Not Found"))
        .mount(&server)
        .await;

    let source = HttpVersionSource::new();
    let version = source
        .fetch_remote_version(&format!("{}/indicator_version", server.uri()))
        .await
        .unwrap();

    assert_eq!(version, "404: Not Found");
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let err = HttpVersionSource::new()
        .fetch_remote_version("http://127.0.0.1:1/indicator_version")
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn slow_version_marker_is_a_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indicator_version"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("v1")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let source = HttpVersionSource::new().with_timeout(Duration::from_millis(100));
    let err = source
        .fetch_remote_version(&format!("{}/indicator_version", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Timeout(_)), "got {err:?}");
}
