use std::sync::Arc;

/// Errors from the platform secret store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// No secure storage facility exists on this host.
    #[error("secure storage unavailable: {0}")]
    Unavailable(String),

    #[error("secure storage error: {0}")]
    Backend(String),

    #[error("token is empty")]
    EmptyToken,
}

/// A token as it should be stored and sent: surrounding whitespace
/// removed, `None` if nothing is left.
pub fn normalize_token(raw: &str) -> Option<&str> {
    let token = raw.trim();
    (!token.is_empty()).then_some(token)
}

/// Raw access to one secret slot in a platform store.
///
/// The slot is fixed by the backend (service/account pair); callers never
/// choose it.
pub trait SecretBackend: Send + Sync {
    fn set_secret(&self, secret: &str) -> Result<(), CredentialError>;

    /// `Ok(None)` when nothing is stored.
    fn get_secret(&self) -> Result<Option<String>, CredentialError>;

    /// Removing an absent secret succeeds.
    fn delete_secret(&self) -> Result<(), CredentialError>;
}

/// Holds the single bearer token used for repository access.
///
/// Every call goes to the backend; nothing is cached here.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SecretBackend>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
        Self { backend }
    }

    /// Save `token` after normalizing it. Blank tokens are rejected.
    pub fn store(&self, token: &str) -> Result<(), CredentialError> {
        let token = normalize_token(token).ok_or(CredentialError::EmptyToken)?;
        self.backend.set_secret(token).inspect_err(|e| {
            tracing::warn!(error = %e, "failed to store token");
        })
    }

    pub fn retrieve(&self) -> Result<Option<String>, CredentialError> {
        self.backend.get_secret().inspect_err(|e| {
            tracing::warn!(error = %e, "failed to read token");
        })
    }

    pub fn erase(&self) -> Result<(), CredentialError> {
        self.backend.delete_secret().inspect_err(|e| {
            tracing::warn!(error = %e, "failed to delete token");
        })
    }

    /// Token lookup for a sync pass. Backend failures count as "no token".
    pub fn token_for_sync(&self) -> Option<String> {
        self.retrieve()
            .ok()
            .flatten()
            .and_then(|token| normalize_token(&token).map(str::to_owned))
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}
