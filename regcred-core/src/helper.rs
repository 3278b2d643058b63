//! The outward-facing credential-helper contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::ambient::{AmbientCredentials, DetectOptions};
use crate::config::HelperConfig;
use crate::error::HelperError;
use crate::reauth::{LoginAgent, ReauthCoordinator};
use crate::resolver::TokenResolver;
use crate::sources::{AmbientSource, CommandRunner, GcloudSource, StoreSource};
use crate::store::{CredentialStore, Secret};

/// A username/secret pair for one registry.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: Secret,
}

/// The contract host tooling calls: the four operations of the Docker
/// credential-helper protocol.
#[async_trait]
pub trait CredentialHelper: Send + Sync {
    /// Resolve the username and secret for a registry server URL.
    async fn get(&self, server_url: &str) -> Result<Credentials, HelperError>;

    /// List stored server URLs and usernames.
    async fn list(&self) -> Result<HashMap<String, String>, HelperError>;

    /// Store third-party credentials.
    async fn add(&self, credentials: &Credentials) -> Result<(), HelperError>;

    /// Remove credentials for a server URL.
    async fn delete(&self, server_url: &str) -> Result<(), HelperError>;
}

/// The one [`CredentialHelper`] implementation: resolve-only, single
/// canonical identity.
///
/// `list`, `add` and `delete` always fail; nothing mutates state through
/// this facade beyond what reauthentication itself persists.
pub struct RegistryHelper {
    username: String,
    coordinator: ReauthCoordinator,
}

impl RegistryHelper {
    /// Wire the full pipeline from configuration and the external
    /// collaborators.
    pub fn new(
        config: &HelperConfig,
        store: Arc<dyn CredentialStore>,
        detector: Arc<dyn AmbientCredentials>,
        runner: Arc<dyn CommandRunner>,
        login: Arc<dyn LoginAgent>,
    ) -> Self {
        let http = reqwest::Client::new();
        let options = DetectOptions {
            scopes: config.scopes.clone(),
            use_self_signed_jwt: config.use_self_signed_jwt,
        };

        let resolver = TokenResolver::new(
            config.token_sources.clone(),
            Box::new(AmbientSource::new(detector, options)),
            Box::new(GcloudSource::new(runner)),
            Box::new(StoreSource::new(
                store.clone(),
                http,
                config.token_endpoint.clone(),
                config.scopes.clone(),
            )),
        );

        Self {
            username: config.username.clone(),
            coordinator: ReauthCoordinator::new(resolver, login, store),
        }
    }

    /// Assemble a helper from an already-built coordinator.
    pub fn from_parts(username: impl Into<String>, coordinator: ReauthCoordinator) -> Self {
        Self {
            username: username.into(),
            coordinator,
        }
    }
}

#[async_trait]
impl CredentialHelper for RegistryHelper {
    async fn get(&self, _server_url: &str) -> Result<Credentials, HelperError> {
        // The server URL is ignored: every GCR-style host shares the one
        // canonical identity, and the same token works for all of them.
        match self.coordinator.resolve_with_reauth().await? {
            Some(secret) => Ok(Credentials {
                username: self.username.clone(),
                secret,
            }),
            None => Err(HelperError::NoSources),
        }
    }

    async fn list(&self) -> Result<HashMap<String, String>, HelperError> {
        Err(HelperError::Unimplemented { op: "list" })
    }

    async fn add(&self, _credentials: &Credentials) -> Result<(), HelperError> {
        Err(HelperError::Unimplemented { op: "add" })
    }

    async fn delete(&self, _server_url: &str) -> Result<(), HelperError> {
        Err(HelperError::Unimplemented { op: "delete" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reauth::{LoginError, StatusSink};
    use crate::sources::{SourceError, TokenSource};
    use crate::store::{MemoryStore, StoredAuth};

    struct NoLogin;

    #[async_trait]
    impl LoginAgent for NoLogin {
        async fn perform_login(&self) -> Result<StoredAuth, LoginError> {
            Err(LoginError::Unavailable {
                message: "not expected in this test".to_string(),
            })
        }
    }

    struct Silent;

    impl StatusSink for Silent {
        fn line(&self, _message: &str) {}
    }

    struct FixedSource(&'static str);

    #[async_trait]
    impl TokenSource for FixedSource {
        async fn fetch(&self) -> Result<Secret, SourceError> {
            Ok(Secret::new(self.0))
        }
    }

    fn helper_with_sources(order: Vec<String>) -> RegistryHelper {
        let resolver = TokenResolver::new(
            order,
            Box::new(FixedSource("ambient-token")),
            Box::new(FixedSource("gcloud-token")),
            Box::new(FixedSource("store-token")),
        );
        let coordinator =
            ReauthCoordinator::new(resolver, Arc::new(NoLogin), Arc::new(MemoryStore::new()))
                .with_status_sink(Arc::new(Silent));
        RegistryHelper::from_parts("oauth2accesstoken", coordinator)
    }

    #[tokio::test]
    async fn get_ignores_the_server_url() {
        let helper = helper_with_sources(vec!["env".to_string()]);

        let a = helper.get("https://gcr.io").await.unwrap();
        let b = helper.get("https://eu.gcr.io/v2/some/repo").await.unwrap();

        assert_eq!(a.username, "oauth2accesstoken");
        assert_eq!(a.secret.expose(), "ambient-token");
        assert_eq!(b.secret.expose(), "ambient-token");
    }

    #[tokio::test]
    async fn empty_source_list_is_an_explicit_error() {
        let helper = helper_with_sources(vec![]);
        let err = helper.get("https://gcr.io").await.unwrap_err();
        assert!(matches!(err, HelperError::NoSources));
    }

    #[tokio::test]
    async fn mutating_operations_are_unimplemented() {
        let helper = helper_with_sources(vec!["env".to_string()]);

        let err = helper.list().await.unwrap_err();
        assert_eq!(err.to_string(), "list is unimplemented");

        let creds = Credentials {
            username: "user".to_string(),
            secret: Secret::new("secret"),
        };
        let err = helper.add(&creds).await.unwrap_err();
        assert_eq!(err.to_string(), "add is unimplemented");

        let err = helper.delete("https://gcr.io").await.unwrap_err();
        assert_eq!(err.to_string(), "delete is unimplemented");
    }
}
