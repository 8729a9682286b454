use indicators::constants::{KEYRING_ACCOUNT, KEYRING_SERVICE};
use indicators::{CredentialError, SecretBackend};

/// Token slot in the operating system's credential store.
///
/// The entry handle is created per call so a store that appears after
/// startup (e.g. an unlocked keychain) is picked up.
pub struct KeyringBackend {
    service: String,
    account: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_owned(),
            account: KEYRING_ACCOUNT.to_owned(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, CredentialError> {
        keyring::Entry::new(&self.service, &self.account).map_err(map_error)
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretBackend for KeyringBackend {
    fn set_secret(&self, secret: &str) -> Result<(), CredentialError> {
        self.entry()?.set_password(secret).map_err(map_error)
    }

    fn get_secret(&self) -> Result<Option<String>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(map_error(e)),
        }
    }

    fn delete_secret(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(map_error(e)),
        }
    }
}

fn map_error(e: keyring::Error) -> CredentialError {
    match e {
        keyring::Error::PlatformFailure(inner) | keyring::Error::NoStorageAccess(inner) => {
            CredentialError::Unavailable(inner.to_string())
        }
        other => CredentialError::Backend(other.to_string()),
    }
}
