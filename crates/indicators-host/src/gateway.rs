//! The only surface the UI process can reach.
//!
//! Requests arrive as `{"id", "op", "args"}` objects and are validated into
//! a [`GatewayRequest`] before anything privileged runs. Events from the
//! orchestrator are forwarded as push messages.

use std::sync::Arc;

use indicators::path::validate_relative_path;
use indicators::{
    CredentialStore, SubscriptionId, SyncOrchestrator, SyncResult, normalize_token,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// A validated UI request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayRequest {
    GetInstalledVersion,
    CheckRemoteVersion { url: String },
    DownloadIndicators(indicators::DownloadOptions),
    StoreToken { token: String },
    GetToken,
    DeleteToken,
    ListInstalledFiles,
    ReadInstalledFile { relative_path: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UrlArgs {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenArgs {
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathArgs {
    #[serde(rename = "relativePath")]
    relative_path: String,
}

impl GatewayRequest {
    /// Validate an operation name and its arguments.
    pub fn parse(op: &str, args: Option<Value>) -> Result<Self, GatewayError> {
        match op {
            "getInstalledVersion" => no_args(op, args).map(|()| Self::GetInstalledVersion),
            "checkRemoteVersion" => {
                let UrlArgs { url } = typed_args(op, args)?;
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(GatewayError::invalid(format!(
                        "{op}: url must be http(s)"
                    )));
                }
                Ok(Self::CheckRemoteVersion { url })
            }
            "downloadIndicators" => {
                let options = match args {
                    None | Some(Value::Null) => indicators::DownloadOptions::default(),
                    Some(value) => typed_args(op, Some(value))?,
                };
                Ok(Self::DownloadIndicators(options))
            }
            "storeToken" => {
                let TokenArgs { token } = typed_args(op, args)?;
                if normalize_token(&token).is_none() {
                    return Err(GatewayError::invalid(format!("{op}: token is empty")));
                }
                Ok(Self::StoreToken { token })
            }
            "getToken" => no_args(op, args).map(|()| Self::GetToken),
            "deleteToken" => no_args(op, args).map(|()| Self::DeleteToken),
            "listInstalledFiles" => no_args(op, args).map(|()| Self::ListInstalledFiles),
            "readInstalledFile" => {
                let PathArgs { relative_path } = typed_args(op, args)?;
                validate_relative_path(&relative_path)
                    .map_err(|e| GatewayError::invalid(format!("{op}: {e}")))?;
                Ok(Self::ReadInstalledFile { relative_path })
            }
            other => Err(GatewayError::invalid(format!("unknown operation: {other}"))),
        }
    }
}

impl GatewayRequest {
    /// Wire name of the operation.
    pub fn op(&self) -> &'static str {
        match self {
            Self::GetInstalledVersion => "getInstalledVersion",
            Self::CheckRemoteVersion { .. } => "checkRemoteVersion",
            Self::DownloadIndicators(_) => "downloadIndicators",
            Self::StoreToken { .. } => "storeToken",
            Self::GetToken => "getToken",
            Self::DeleteToken => "deleteToken",
            Self::ListInstalledFiles => "listInstalledFiles",
            Self::ReadInstalledFile { .. } => "readInstalledFile",
        }
    }
}

fn no_args(op: &str, args: Option<Value>) -> Result<(), GatewayError> {
    match args {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Object(map)) if map.is_empty() => Ok(()),
        Some(_) => Err(GatewayError::invalid(format!("{op} takes no arguments"))),
    }
}

fn typed_args<T: serde::de::DeserializeOwned>(
    op: &str,
    args: Option<Value>,
) -> Result<T, GatewayError> {
    let value = args.ok_or_else(|| GatewayError::invalid(format!("{op}: missing arguments")))?;
    if !value.is_object() {
        return Err(GatewayError::invalid(format!("{op}: arguments must be an object")));
    }
    serde_json::from_value(value).map_err(|e| GatewayError::invalid(format!("{op}: {e}")))
}

/// Wire form of a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayError {
    pub code: &'static str,
    pub message: String,
}

impl GatewayError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: "invalid-request",
            message: message.into(),
        }
    }
}

/// Reply to `checkRemoteVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteVersionReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the host writes to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Response {
        id: Option<u64>,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<GatewayError>,
    },
    Event {
        event: &'static str,
        payload: Value,
    },
}

impl Outbound {
    fn ok(id: u64, data: Value) -> Self {
        Self::Response {
            id: Some(id),
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub(crate) fn rejected(id: Option<u64>, error: GatewayError) -> Self {
        Self::Response {
            id,
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    id: u64,
    op: String,
    #[serde(default)]
    args: Option<Value>,
}

/// Executes validated requests against the privileged services.
pub struct Gateway {
    orchestrator: Arc<SyncOrchestrator>,
    credentials: CredentialStore,
}

impl Gateway {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, credentials: CredentialStore) -> Self {
        Self {
            orchestrator,
            credentials,
        }
    }

    /// Forward every orchestrator event to `tx` until detached.
    pub fn attach_events(&self, tx: mpsc::UnboundedSender<Outbound>) -> SubscriptionId {
        self.orchestrator.subscribe_all(move |event| {
            let payload = match serde_json::to_value(event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unserializable event");
                    return;
                }
            };
            // A closed channel means the UI went away; nothing to do.
            let _ = tx.send(Outbound::Event {
                event: event.kind().as_str(),
                payload,
            });
        })
    }

    pub fn detach_events(&self, id: SubscriptionId) {
        self.orchestrator.unsubscribe(id);
    }

    /// Parse, validate and execute one raw message.
    pub async fn handle_message(&self, raw: &str) -> Outbound {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                return Outbound::rejected(None, GatewayError::invalid(format!("not JSON: {e}")));
            }
        };

        let id = value.get("id").and_then(Value::as_u64);

        let envelope: Envelope = match serde_json::from_value(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Outbound::rejected(id, GatewayError::invalid(format!("bad envelope: {e}")));
            }
        };

        match GatewayRequest::parse(&envelope.op, envelope.args) {
            Ok(request) => Outbound::ok(envelope.id, self.dispatch(request).await),
            Err(error) => {
                tracing::warn!(op = %envelope.op, error = %error.message, "rejected gateway request");
                Outbound::rejected(Some(envelope.id), error)
            }
        }
    }

    /// Run a validated request. Every operation yields a value; failures are
    /// folded into the operation's own result shape.
    pub async fn dispatch(&self, request: GatewayRequest) -> Value {
        tracing::debug!(op = request.op(), "gateway request");

        match request {
            GatewayRequest::GetInstalledVersion => json(self.orchestrator.installed_version()),
            GatewayRequest::CheckRemoteVersion { url } => {
                let reply = match self.orchestrator.remote_version(&url).await {
                    Ok(version) => RemoteVersionReply {
                        success: true,
                        version: Some(version),
                        error: None,
                    },
                    Err(e) => RemoteVersionReply {
                        success: false,
                        version: None,
                        error: Some(e.to_string()),
                    },
                };
                json(reply)
            }
            GatewayRequest::DownloadIndicators(options) => {
                let result = self
                    .orchestrator
                    .download_indicators(options)
                    .await
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "download request failed");
                        SyncResult::failed(self.orchestrator.directory().to_path_buf(), &e)
                    });
                json(result)
            }
            GatewayRequest::StoreToken { token } => json(self.credentials.store(&token).is_ok()),
            GatewayRequest::GetToken => json(self.credentials.retrieve().ok().flatten()),
            GatewayRequest::DeleteToken => json(self.credentials.erase().is_ok()),
            GatewayRequest::ListInstalledFiles => {
                let files = self
                    .orchestrator
                    .context()
                    .storage
                    .list_installed_files()
                    .unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "failed to list installed files");
                        Vec::new()
                    });
                json(files)
            }
            GatewayRequest::ReadInstalledFile { relative_path } => {
                let content = self
                    .orchestrator
                    .context()
                    .storage
                    .read_file(&relative_path)
                    .unwrap_or_else(|e| {
                        tracing::warn!(path = %relative_path, error = %e, "failed to read file");
                        None
                    });
                json(content)
            }
        }
    }
}

fn json<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
