//! In-memory credential storage implementation.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{CredentialStore, StoreError, StoredAuth};

/// In-memory credential store for testing and development.
///
/// Not persistent; the credential is lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    auth: RwLock<Option<StoredAuth>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store seeded with a credential.
    pub fn with_auth(auth: StoredAuth) -> Self {
        Self {
            auth: RwLock::new(Some(auth)),
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("populated", &self.auth.read().is_some())
            .finish()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get_auth(&self) -> Result<StoredAuth, StoreError> {
        self.auth.read().clone().ok_or(StoreError::NotFound)
    }

    async fn set_auth(&self, auth: &StoredAuth) -> Result<(), StoreError> {
        *self.auth.write() = Some(auth.clone());
        Ok(())
    }

    async fn delete_auth(&self) -> Result<(), StoreError> {
        *self.auth.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Secret;

    fn sample_auth() -> StoredAuth {
        StoredAuth {
            client_id: "client-id".to_string(),
            client_secret: Secret::new("client-secret"),
            refresh_token: Secret::new("refresh-token"),
            token_uri: None,
        }
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        store.set_auth(&sample_auth()).await.unwrap();

        let auth = store.get_auth().await.unwrap();
        assert_eq!(auth, sample_auth());
    }

    #[tokio::test]
    async fn empty_store_reports_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_auth().await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_clears_the_credential() {
        let store = MemoryStore::with_auth(sample_auth());
        store.delete_auth().await.unwrap();
        assert!(matches!(
            store.get_auth().await,
            Err(StoreError::NotFound)
        ));

        // Deleting again is fine.
        store.delete_auth().await.unwrap();
    }
}
