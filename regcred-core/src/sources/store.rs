//! Token source backed by the credential store's persisted grant.

use std::sync::Arc;

use async_trait::async_trait;

use super::{SourceError, TokenSource};
use crate::oauth;
use crate::store::{CredentialStore, Secret};

/// Resolves a token by refreshing the store-held grant against the OAuth
/// token endpoint. Performs a network call on every fetch; the access token
/// itself is never cached here.
pub struct StoreSource {
    store: Arc<dyn CredentialStore>,
    http: reqwest::Client,
    token_endpoint: String,
    scopes: Vec<String>,
}

impl StoreSource {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        http: reqwest::Client,
        token_endpoint: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            store,
            http,
            token_endpoint: token_endpoint.into(),
            scopes,
        }
    }
}

#[async_trait]
impl TokenSource for StoreSource {
    async fn fetch(&self) -> Result<Secret, SourceError> {
        let auth = self.store.get_auth().await?;

        let token =
            match oauth::refresh_grant(&self.http, &self.token_endpoint, &auth, &self.scopes).await
            {
                Ok(token) => token,
                Err(err) if err.is_revoked_grant() => {
                    return Err(SourceError::RevokedGrant(err));
                }
                Err(err) => return Err(SourceError::TokenRefresh(err)),
            };

        if !token.is_usable() {
            return Err(SourceError::InvalidToken);
        }
        Ok(token.value)
    }
}
