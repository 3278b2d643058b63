//! Token source backed by ambient credential detection.

use std::sync::Arc;

use async_trait::async_trait;

use super::{SourceError, TokenSource};
use crate::ambient::{AmbientCredentials, DetectError, DetectOptions};
use crate::store::Secret;

/// Resolves a token from whatever credentials the environment provides.
/// Read-only; never mutates any store.
pub struct AmbientSource {
    detector: Arc<dyn AmbientCredentials>,
    options: DetectOptions,
}

impl AmbientSource {
    pub fn new(detector: Arc<dyn AmbientCredentials>, options: DetectOptions) -> Self {
        Self { detector, options }
    }
}

#[async_trait]
impl TokenSource for AmbientSource {
    async fn fetch(&self) -> Result<Secret, SourceError> {
        let credential = self
            .detector
            .detect(&self.options)
            .await
            .map_err(SourceError::InvalidCredentials)?;

        let token = match credential.token().await {
            Ok(token) => token,
            Err(DetectError::OAuth(err)) if err.is_revoked_grant() => {
                return Err(SourceError::RevokedGrant(err));
            }
            Err(err) => return Err(SourceError::Upstream(err)),
        };

        if !token.is_usable() {
            return Err(SourceError::InvalidToken);
        }
        if token.token_type != "Bearer" {
            return Err(SourceError::UnexpectedTokenType {
                got: token.token_type,
            });
        }

        Ok(token.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambient::DetectedCredential;
    use crate::token::Token;
    use chrono::{Duration, Utc};

    struct FixedDetector(Token);

    #[async_trait]
    impl AmbientCredentials for FixedDetector {
        async fn detect(
            &self,
            _options: &DetectOptions,
        ) -> Result<DetectedCredential, DetectError> {
            Ok(DetectedCredential::from_token(self.0.clone()))
        }
    }

    struct EmptyDetector;

    #[async_trait]
    impl AmbientCredentials for EmptyDetector {
        async fn detect(
            &self,
            _options: &DetectOptions,
        ) -> Result<DetectedCredential, DetectError> {
            Err(DetectError::NoCredentials)
        }
    }

    fn options() -> DetectOptions {
        DetectOptions {
            scopes: vec!["https://www.googleapis.com/auth/cloud-platform".to_string()],
            use_self_signed_jwt: true,
        }
    }

    #[tokio::test]
    async fn usable_bearer_token_resolves() {
        let token = Token::bearer("abc").with_expiry(Utc::now() + Duration::hours(1));
        let source = AmbientSource::new(Arc::new(FixedDetector(token)), options());

        let secret = source.fetch().await.unwrap();
        assert_eq!(secret.expose(), "abc");
    }

    #[tokio::test]
    async fn detection_failure_maps_to_invalid_credentials() {
        let source = AmbientSource::new(Arc::new(EmptyDetector), options());
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidCredentials(_)));
        assert!(err.to_string().contains("failed to detect default credentials"));
    }

    #[tokio::test]
    async fn unusable_token_is_rejected() {
        // Expired an hour ago.
        let token = Token::bearer("abc").with_expiry(Utc::now() - Duration::hours(1));
        let source = AmbientSource::new(Arc::new(FixedDetector(token)), options());

        assert!(matches!(
            source.fetch().await,
            Err(SourceError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn non_bearer_token_is_rejected() {
        let token = Token::bearer("abc")
            .with_type("MAC")
            .with_expiry(Utc::now() + Duration::hours(1));
        let source = AmbientSource::new(Arc::new(FixedDetector(token)), options());

        let err = source.fetch().await.unwrap_err();
        assert!(matches!(
            &err,
            SourceError::UnexpectedTokenType { got } if got == "MAC"
        ));
        assert!(err.to_string().contains("expected token type \"Bearer\""));
    }

    #[tokio::test]
    async fn validity_is_checked_before_the_type_tag() {
        // Wrong type AND expired: the validity rejection wins.
        let token = Token::bearer("abc").with_type("MAC");
        let source = AmbientSource::new(Arc::new(FixedDetector(token)), options());

        assert!(matches!(
            source.fetch().await,
            Err(SourceError::InvalidToken)
        ));
    }
}
