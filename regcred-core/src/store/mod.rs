//! The persisted user credential and its storage backends.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`StoredAuth`] - The refresh-token credential persisted between invocations
//! - [`CredentialStore`] - Trait for credential storage backends
//! - [`FileStore`] - JSON file under the platform config directory
//! - [`MemoryStore`] - In-memory implementation for testing
//! - [`KeyringStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`create_store`] - Helper to select a backend based on availability
//!
//! The store holds exactly one credential: the helper resolves a single
//! canonical identity, so there is no per-registry keying. A read-modify-write
//! during reauthentication is not atomic against concurrent writers; the
//! persisted credential is last-writer-wins.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod file;
#[cfg(feature = "keyring-store")]
mod keyring;
mod memory;

pub use file::FileStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;
pub use memory::MemoryStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the buffer is zeroed on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// The user credential persisted by the store: an OAuth refresh-token grant
/// for the canonical registry identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAuth {
    /// OAuth client ID the grant was issued to.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: Secret,

    /// The long-lived refresh token.
    pub refresh_token: Secret,

    /// Token endpoint the grant refreshes against. `None` means the
    /// configured default endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
}

/// Error type for credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No credential has been persisted yet.
    #[error("no stored credential found")]
    NotFound,

    /// The storage backend could not be read or written.
    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted credential could not be (de)serialized.
    #[error("malformed stored credential: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage backend encountered an error.
    #[error("credential store backend error: {message}")]
    Backend { message: String },

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },
}

/// Abstraction over credential storage backends.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Retrieve the persisted credential.
    ///
    /// Returns [`StoreError::NotFound`] if nothing has been stored.
    async fn get_auth(&self) -> Result<StoredAuth, StoreError>;

    /// Persist a credential, overwriting any existing one.
    async fn set_auth(&self, auth: &StoredAuth) -> Result<(), StoreError>;

    /// Remove the persisted credential. Succeeds if nothing was stored.
    async fn delete_auth(&self) -> Result<(), StoreError>;
}

/// Create a credential store with automatic backend selection.
///
/// With `prefer_keyring` and the `keyring-store` feature, the OS keyring is
/// tried first; when it is unavailable (headless systems without a keyring
/// daemon, typically) the file store takes over. Without a resolvable config
/// directory the store degrades to memory and credentials will not persist
/// across invocations.
pub fn create_store(prefer_keyring: bool) -> std::sync::Arc<dyn CredentialStore> {
    #[cfg(feature = "keyring-store")]
    if prefer_keyring {
        match KeyringStore::try_new() {
            Ok(store) => {
                tracing::debug!("using OS keyring for credential storage");
                return std::sync::Arc::new(store);
            }
            Err(e) => {
                tracing::warn!("keyring unavailable ({e}), falling back to file store");
            }
        }
    }

    #[cfg(not(feature = "keyring-store"))]
    if prefer_keyring {
        tracing::warn!(
            "keyring storage requested but the keyring-store feature is not enabled; \
             using the file store"
        );
    }

    match FileStore::default_path() {
        Some(path) => std::sync::Arc::new(FileStore::new(path)),
        None => {
            tracing::warn!(
                "no config directory available; credentials will not persist across invocations"
            );
            std::sync::Arc::new(MemoryStore::new())
        }
    }
}
