//! OS keyring-backed credential storage implementation.

use async_trait::async_trait;
use keyring::Entry;

use super::{CredentialStore, StoreError, StoredAuth};

const SERVICE_NAME: &str = "regcred";
const ENTRY_USER: &str = "oauth-credential";

/// Credential store backed by the platform keyring service:
/// - macOS: Keychain
/// - Linux: Secret Service API (via libsecret)
/// - Windows: Credential Manager
///
/// The whole [`StoredAuth`] is held as one JSON-serialized entry.
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Try to create a keyring store.
    ///
    /// Returns an error if the keyring backend is not available on this
    /// platform. Note that on headless systems without a keyring daemon,
    /// entry creation can succeed while reads and writes later fail.
    pub fn try_new() -> Result<Self, StoreError> {
        match Entry::new(SERVICE_NAME, ENTRY_USER) {
            Ok(_) => Ok(Self {
                service_name: SERVICE_NAME.to_string(),
            }),
            Err(e) => Err(StoreError::KeyringUnavailable {
                message: format!("keyring backend not available: {}", e),
            }),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Entry::new(&self.service_name, ENTRY_USER).map_err(|e| StoreError::Backend {
            message: format!("failed to create keyring entry: {}", e),
        })
    }
}

impl std::fmt::Debug for KeyringStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

#[async_trait]
impl CredentialStore for KeyringStore {
    async fn get_auth(&self) -> Result<StoredAuth, StoreError> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(serialized) => Ok(serde_json::from_str(&serialized)?),
            Err(keyring::Error::NoEntry) => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Backend {
                message: format!("keyring error: {}", e),
            }),
        }
    }

    async fn set_auth(&self, auth: &StoredAuth) -> Result<(), StoreError> {
        let entry = self.entry()?;
        let serialized = serde_json::to_string(auth)?;
        entry.set_password(&serialized).map_err(|e| StoreError::Backend {
            message: format!("failed to write keyring entry: {}", e),
        })
    }

    async fn delete_auth(&self) -> Result<(), StoreError> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(StoreError::Backend {
                message: format!("failed to delete keyring entry: {}", e),
            }),
        }
    }
}
