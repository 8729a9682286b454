//! Newline-delimited JSON between the host and the UI process.

use std::sync::Arc;

use anyhow::{Context, Result};
use indicators::SubscriptionId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::gateway::{Gateway, GatewayError, Outbound};

/// Keeps events flowing to the UI until dropped.
struct EventForwarding {
    gateway: Arc<Gateway>,
    id: SubscriptionId,
}

impl EventForwarding {
    fn attach(gateway: &Arc<Gateway>, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: gateway.attach_events(tx),
            gateway: Arc::clone(gateway),
        }
    }
}

impl Drop for EventForwarding {
    fn drop(&mut self) {
        self.gateway.detach_events(self.id);
    }
}

/// Serve requests from `reader` until it reaches EOF.
///
/// Each request runs on its own task so a long download does not block
/// token or file queries. Responses and events share one writer and are
/// written in the order they are produced. A line that is not UTF-8 is
/// answered with a rejection and does not end the session.
pub async fn serve<R, W>(gateway: Arc<Gateway>, mut reader: R, writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
    let forwarding = EventForwarding::attach(&gateway, tx.clone());
    let writer_task = tokio::spawn(write_messages(rx, writer));

    let mut in_flight = JoinSet::new();
    let mut buf = Vec::new();
    let mut read_error = None;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request, closing session");
                read_error = Some(e);
                break;
            }
        }

        while let Some(finished) = in_flight.try_join_next() {
            log_task_failure(finished);
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!(error = %e, "rejected non-UTF-8 request line");
                let _ = tx.send(Outbound::rejected(
                    None,
                    GatewayError::invalid(format!("request is not UTF-8: {e}")),
                ));
                continue;
            }
        };

        if line.is_empty() {
            continue;
        }

        let line = line.to_owned();
        let gateway = Arc::clone(&gateway);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let reply = gateway.handle_message(&line).await;
            let _ = tx.send(reply);
        });
    }

    tracing::debug!(pending = in_flight.len(), "input closed, draining requests");
    while let Some(finished) = in_flight.join_next().await {
        log_task_failure(finished);
    }

    drop(forwarding);
    drop(tx);

    writer_task.await.context("writer task panicked")??;

    match read_error {
        Some(e) => Err(e).context("failed to read request"),
        None => Ok(()),
    }
}

fn log_task_failure(finished: Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        tracing::warn!(error = %e, "request task failed");
    }
}

async fn write_messages<W>(mut rx: mpsc::UnboundedReceiver<Outbound>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let mut line = serde_json::to_string(&message).context("failed to encode message")?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .context("failed to write message")?;
        writer.flush().await.context("failed to flush output")?;
    }
    writer.shutdown().await.context("failed to close output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use indicators::test_support::{FakeRemote, FakeVersionSource, Harness, MemoryStorage};
    use serde_json::Value;
    use tokio::io::AsyncReadExt;

    use super::*;

    async fn run(input: &[u8]) -> Vec<Value> {
        let h = Harness::new(
            FakeRemote::new().with_file("indicators/a.json", b"{}".to_vec()),
            FakeVersionSource::new("v1"),
            MemoryStorage::new(),
        );
        let gateway = Arc::new(Gateway::new(
            Arc::clone(&h.orchestrator),
            h.credentials.clone(),
        ));

        let (writer, mut output) = tokio::io::duplex(64 * 1024);
        serve(gateway, input, writer).await.unwrap();

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        text.lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn answers_each_request_by_id() {
        let out = run(concat!(
            r#"{"id":1,"op":"storeToken","args":{"token":"t"}}"#,
            "\n\n",
            r#"{"id":2,"op":"bogus"}"#,
            "\n",
        )
        .as_bytes())
        .await;

        assert_eq!(out.len(), 2);
        let first = out.iter().find(|m| m["id"] == 1).unwrap();
        assert_eq!(first["type"], "response");
        assert_eq!(first["ok"], true);
        assert_eq!(first["data"], true);

        let second = out.iter().find(|m| m["id"] == 2).unwrap();
        assert_eq!(second["ok"], false);
        assert_eq!(second["error"]["code"], "invalid-request");
    }

    #[tokio::test]
    async fn download_events_precede_its_response() {
        let out = run(concat!(
            r#"{"id":5,"op":"downloadIndicators","args":{"owner":"o","repo":"r","version":"v1"}}"#,
            "\n",
        )
        .as_bytes())
        .await;

        let kinds: Vec<&str> = out
            .iter()
            .map(|m| m["event"].as_str().unwrap_or("response"))
            .collect();
        assert_eq!(
            kinds,
            vec![
                "download-start",
                "download-progress",
                "download-complete",
                "response"
            ]
        );
        assert_eq!(out[3]["data"]["downloadedCount"], 1);
    }

    #[tokio::test]
    async fn empty_input_closes_cleanly() {
        assert!(run(b"").await.is_empty());
    }

    #[tokio::test]
    async fn non_utf8_line_is_rejected_and_serving_continues() {
        let out = run(b"\xff\xfe\n{\"id\":1,\"op\":\"getToken\"}\n").await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["type"], "response");
        assert_eq!(out[0]["id"], Value::Null);
        assert_eq!(out[0]["ok"], false);
        assert_eq!(out[0]["error"]["code"], "invalid-request");

        assert_eq!(out[1]["id"], 1);
        assert_eq!(out[1]["ok"], true);
        assert_eq!(out[1]["data"], Value::Null);
    }

    #[tokio::test]
    async fn last_line_without_newline_is_served() {
        let out = run(br#"{"id":3,"op":"listInstalledFiles"}"#).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], 3);
        assert_eq!(out[0]["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn events_stop_after_the_session_ends() {
        let h = Harness::new(
            FakeRemote::new().with_file("indicators/a.json", b"{}".to_vec()),
            FakeVersionSource::new("v1"),
            MemoryStorage::new(),
        );
        let gateway = Arc::new(Gateway::new(
            Arc::clone(&h.orchestrator),
            h.credentials.clone(),
        ));

        let (writer, mut output) = tokio::io::duplex(64 * 1024);
        // Returning at all means the forwarding sender was released.
        serve(Arc::clone(&gateway), &b""[..], writer).await.unwrap();

        h.orchestrator
            .download_indicators(indicators::DownloadOptions {
                owner: Some("o".into()),
                repo: Some("r".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();
        assert!(text.is_empty());
    }
}
