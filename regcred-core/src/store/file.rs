//! JSON-file credential storage implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use directories::ProjectDirs;

use super::{CredentialStore, StoreError, StoredAuth};

/// Credential store backed by a JSON file.
///
/// The default location is `credentials.json` under the platform config
/// directory for `regcred`. On Unix the file is created with mode `0600`.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Create a file store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The default credential file location, or `None` when no config
    /// directory can be determined for this user.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "regcred", "regcred")
            .map(|dirs| dirs.config_dir().join("credentials.json"))
    }

    /// The path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    async fn restrict_permissions(&self) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&self.path, perms).await
    }

    #[cfg(not(unix))]
    async fn restrict_permissions(&self) -> std::io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("path", &self.path).finish()
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get_auth(&self) -> Result<StoredAuth, StoreError> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&contents)?)
    }

    async fn set_auth(&self, auth: &StoredAuth) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_vec_pretty(auth)?;
        tokio::fs::write(&self.path, contents).await?;
        self.restrict_permissions().await?;
        tracing::debug!(path = %self.path.display(), "persisted credential");
        Ok(())
    }

    async fn delete_auth(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
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
            token_uri: Some("https://oauth2.example.com/token".to_string()),
        }
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("credentials.json"));

        store.set_auth(&sample_auth()).await.unwrap();
        let auth = store.get_auth().await.unwrap();
        assert_eq!(auth, sample_auth());
    }

    #[tokio::test]
    async fn missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("credentials.json"));

        assert!(matches!(store.get_auth().await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn set_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested/deeper/credentials.json"));

        store.set_auth(&sample_auth()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn malformed_file_reports_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let store = FileStore::new(path);
        assert!(matches!(
            store.get_auth().await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn credential_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("credentials.json"));
        store.set_auth(&sample_auth()).await.unwrap();

        let mode = tokio::fs::metadata(store.path())
            .await
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("credentials.json"));

        store.delete_auth().await.unwrap();
        store.set_auth(&sample_auth()).await.unwrap();
        store.delete_auth().await.unwrap();
        store.delete_auth().await.unwrap();
        assert!(matches!(store.get_auth().await, Err(StoreError::NotFound)));
    }
}
