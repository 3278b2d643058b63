//! The OAuth refresh-grant exchange and its structured error body.
//!
//! Both places that refresh a grant — ambient authorized-user credentials and
//! the store-held credential — go through [`refresh_grant`], so the token
//! endpoint's error body is deserialized in exactly one place and downstream
//! code matches on [`OAuthError`] variants instead of re-parsing bytes.

use chrono::{Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::store::StoredAuth;
use crate::token::Token;

/// Google's OAuth2 token endpoint, the default for stored grants without an
/// explicit `token_uri`.
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenEndpointSuccess {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Structured error body returned by the token endpoint.
///
/// `error_subtype` is the field that distinguishes a revoked reauth proof
/// (`invalid_rapt`) from every other `invalid_grant` failure.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEndpointErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_subtype: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenEndpointErrorBody {
    /// The exact shape that signals a revoked grant requiring interactive
    /// reauthentication. Nothing else triggers the reauth flow.
    pub fn is_revoked_grant(&self) -> bool {
        self.error == "invalid_grant" && self.error_subtype.as_deref() == Some("invalid_rapt")
    }
}

impl std::fmt::Display for TokenEndpointErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(subtype) = &self.error_subtype {
            write!(f, " ({})", subtype)?;
        }
        if let Some(description) = &self.error_description {
            write!(f, ": {}", description)?;
        }
        Ok(())
    }
}

/// Error type for token endpoint exchanges.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The HTTP request itself failed.
    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint rejected the grant with a structured error body.
    #[error("token endpoint rejected the grant: {0}")]
    Grant(TokenEndpointErrorBody),

    /// The endpoint answered with a non-success status and no parseable body.
    #[error("token endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },
}

impl OAuthError {
    /// Whether this error carries the revoked-grant signature.
    pub fn is_revoked_grant(&self) -> bool {
        matches!(self, OAuthError::Grant(body) if body.is_revoked_grant())
    }
}

/// Exchange a stored refresh-token grant for a fresh access token.
///
/// `endpoint` is the configured default; a credential with an explicit
/// `token_uri` overrides it. `scopes` narrows the requested token when
/// non-empty.
pub async fn refresh_grant(
    http: &reqwest::Client,
    endpoint: &str,
    auth: &StoredAuth,
    scopes: &[String],
) -> Result<Token, OAuthError> {
    let endpoint = auth.token_uri.as_deref().unwrap_or(endpoint);

    let scope = scopes.join(" ");
    let mut params = vec![
        ("grant_type", "refresh_token"),
        ("client_id", auth.client_id.as_str()),
        ("client_secret", auth.client_secret.expose()),
        ("refresh_token", auth.refresh_token.expose()),
    ];
    if !scope.is_empty() {
        params.push(("scope", scope.as_str()));
    }

    tracing::debug!(endpoint, "refreshing stored grant");
    let response = http.post(endpoint).form(&params).send().await?;
    let status = response.status();

    if status.is_success() {
        let body: TokenEndpointSuccess = response.json().await?;
        let mut token = Token::bearer(body.access_token);
        if let Some(token_type) = body.token_type {
            token = token.with_type(token_type);
        }
        if let Some(expires_in) = body.expires_in {
            token = token.with_expiry(Utc::now() + Duration::seconds(expires_in));
        }
        return Ok(token);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<TokenEndpointErrorBody>(&body) {
        Ok(parsed) if !parsed.error.is_empty() => Err(OAuthError::Grant(parsed)),
        _ => Err(OAuthError::Endpoint {
            status: status.as_u16(),
            body,
        }),
    }
}
