//! Ambient credential detection.
//!
//! "Ambient" credentials are whatever the environment already provides,
//! discovered without user interaction:
//!
//! 1. A JSON credentials file named by the `GOOGLE_APPLICATION_CREDENTIALS`
//!    environment variable.
//! 2. The well-known application-default-credentials file under the gcloud
//!    config directory.
//! 3. The GCE metadata server (configured scopes are ignored on this path).
//!
//! The [`AmbientCredentials`] trait is the seam the token pipeline consumes;
//! [`AdcDetector`] is the real implementation of the chain above.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::oauth::{self, OAuthError};
use crate::store::{Secret, StoredAuth};
use crate::token::Token;

/// Environment variable naming an explicit credentials file.
pub const CREDENTIALS_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Default metadata server base URL.
pub const METADATA_BASE: &str = "http://metadata.google.internal";

const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";
const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// What the detector should ask for.
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// OAuth scopes to request for the detected credential.
    pub scopes: Vec<String>,

    /// Prefer a self-signed JWT over a token-endpoint exchange where the
    /// credential type supports it.
    pub use_self_signed_jwt: bool,
}

/// Error type for ambient credential detection.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The whole detection chain came up empty.
    #[error("no ambient credentials were found")]
    NoCredentials,

    /// A credentials file could not be read.
    #[error("failed to read credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A credentials file did not parse.
    #[error("malformed credentials file {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The credentials file holds a type this helper cannot use.
    #[error("unsupported credential type \"{kind}\"")]
    Unsupported { kind: String },

    /// The detected credential failed its token-endpoint exchange.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// The metadata server could not be reached.
    #[error("metadata server request failed: {0}")]
    Metadata(#[source] reqwest::Error),

    /// The metadata server answered with a non-success status.
    #[error("metadata server returned HTTP {status}")]
    MetadataStatus { status: u16 },
}

/// Detects credentials already present in the environment.
#[async_trait]
pub trait AmbientCredentials: Send + Sync {
    /// Walk the detection chain and return the first credential found.
    async fn detect(&self, options: &DetectOptions) -> Result<DetectedCredential, DetectError>;
}

/// A credential produced by detection, able to yield an access token.
pub struct DetectedCredential {
    inner: CredentialInner,
}

enum CredentialInner {
    /// A token that was already in hand at detection time.
    Fixed(Token),

    /// An authorized-user grant refreshed through the token endpoint.
    AuthorizedUser {
        auth: StoredAuth,
        endpoint: String,
        scopes: Vec<String>,
        http: reqwest::Client,
    },

    /// The GCE metadata server's default service account.
    MetadataServer { base: String, http: reqwest::Client },
}

impl DetectedCredential {
    /// A credential that yields an already-fetched token.
    pub fn from_token(token: Token) -> Self {
        Self {
            inner: CredentialInner::Fixed(token),
        }
    }

    /// An authorized-user grant that refreshes against `endpoint`.
    pub fn authorized_user(
        auth: StoredAuth,
        endpoint: impl Into<String>,
        scopes: Vec<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            inner: CredentialInner::AuthorizedUser {
                auth,
                endpoint: endpoint.into(),
                scopes,
                http,
            },
        }
    }

    /// The metadata server's default service account at `base`.
    pub fn metadata_server(base: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            inner: CredentialInner::MetadataServer {
                base: base.into(),
                http,
            },
        }
    }

    /// Fetch an access token for this credential.
    pub async fn token(&self) -> Result<Token, DetectError> {
        match &self.inner {
            CredentialInner::Fixed(token) => Ok(token.clone()),
            CredentialInner::AuthorizedUser {
                auth,
                endpoint,
                scopes,
                http,
            } => Ok(oauth::refresh_grant(http, endpoint, auth, scopes).await?),
            CredentialInner::MetadataServer { base, http } => metadata_token(base, http).await,
        }
    }
}

impl std::fmt::Debug for DetectedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            CredentialInner::Fixed(_) => "fixed",
            CredentialInner::AuthorizedUser { .. } => "authorized_user",
            CredentialInner::MetadataServer { .. } => "metadata_server",
        };
        f.debug_struct("DetectedCredential").field("kind", &kind).finish()
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

async fn metadata_token(base: &str, http: &reqwest::Client) -> Result<Token, DetectError> {
    let url = format!("{}{}", base, METADATA_TOKEN_PATH);
    let response = http
        .get(&url)
        .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
        .send()
        .await
        .map_err(DetectError::Metadata)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DetectError::MetadataStatus {
            status: status.as_u16(),
        });
    }

    let body: MetadataTokenResponse = response.json().await.map_err(DetectError::Metadata)?;
    let mut token = Token::bearer(body.access_token);
    if let Some(token_type) = body.token_type {
        token = token.with_type(token_type);
    }
    if let Some(expires_in) = body.expires_in {
        token = token.with_expiry(Utc::now() + Duration::seconds(expires_in));
    }
    Ok(token)
}

/// On-disk credentials file, as written by `gcloud auth application-default
/// login` or downloaded from the console.
#[derive(Debug, Deserialize)]
struct KeyFile {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// The real detection chain: explicit file, well-known file, metadata server.
pub struct AdcDetector {
    http: reqwest::Client,
    env_var: String,
    well_known_path: Option<PathBuf>,
    metadata_base: String,
    token_endpoint: String,
}

impl AdcDetector {
    /// A detector with the standard chain.
    pub fn new(token_endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            env_var: CREDENTIALS_ENV_VAR.to_string(),
            well_known_path: well_known_file(),
            metadata_base: METADATA_BASE.to_string(),
            token_endpoint: token_endpoint.into(),
        }
    }

    /// Override the environment variable consulted for an explicit file.
    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = env_var.into();
        self
    }

    /// Override the well-known credentials file location.
    pub fn with_well_known_path(mut self, path: Option<PathBuf>) -> Self {
        self.well_known_path = path;
        self
    }

    /// Override the metadata server base URL.
    pub fn with_metadata_base(mut self, base: impl Into<String>) -> Self {
        self.metadata_base = base.into();
        self
    }

    async fn load_key_file(
        &self,
        path: &PathBuf,
        options: &DetectOptions,
    ) -> Result<DetectedCredential, DetectError> {
        let contents = tokio::fs::read(path).await.map_err(|source| DetectError::Io {
            path: path.clone(),
            source,
        })?;
        let key_file: KeyFile =
            serde_json::from_slice(&contents).map_err(|source| DetectError::Malformed {
                path: path.clone(),
                source,
            })?;

        match key_file.kind.as_str() {
            "authorized_user" => {
                let auth = StoredAuth {
                    client_id: key_file.client_id,
                    client_secret: Secret::new(key_file.client_secret),
                    refresh_token: Secret::new(key_file.refresh_token),
                    token_uri: key_file.token_uri,
                };
                Ok(DetectedCredential::authorized_user(
                    auth,
                    self.token_endpoint.clone(),
                    options.scopes.clone(),
                    self.http.clone(),
                ))
            }
            // Service-account keys need a signed-JWT exchange this helper
            // does not perform, with or without the self-signed preference.
            kind => Err(DetectError::Unsupported {
                kind: kind.to_string(),
            }),
        }
    }

    async fn metadata_server_reachable(&self) -> bool {
        // Off-GCE this hostname does not resolve; cap the probe so detection
        // fails over quickly instead of hanging on a dead route.
        let probe = self
            .http
            .get(format!("{}/", self.metadata_base))
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
            .timeout(std::time::Duration::from_secs(1))
            .send()
            .await;
        match probe {
            Ok(response) => response
                .headers()
                .get(METADATA_FLAVOR_HEADER)
                .is_some_and(|v| v == METADATA_FLAVOR_VALUE),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl AmbientCredentials for AdcDetector {
    async fn detect(&self, options: &DetectOptions) -> Result<DetectedCredential, DetectError> {
        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.is_empty() {
                tracing::debug!(%path, "using credentials file from {}", self.env_var);
                return self.load_key_file(&PathBuf::from(path), options).await;
            }
        }

        if let Some(path) = &self.well_known_path {
            if path.exists() {
                tracing::debug!(path = %path.display(), "using well-known credentials file");
                return self.load_key_file(path, options).await;
            }
        }

        if self.metadata_server_reachable().await {
            tracing::debug!("using metadata server credentials");
            return Ok(DetectedCredential::metadata_server(
                self.metadata_base.clone(),
                self.http.clone(),
            ));
        }

        Err(DetectError::NoCredentials)
    }
}

/// `$HOME/.config/gcloud/application_default_credentials.json` on Unix,
/// `%APPDATA%\gcloud\application_default_credentials.json` on Windows.
fn well_known_file() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var_os("APPDATA")
            .map(|appdata| PathBuf::from(appdata).join("gcloud/application_default_credentials.json"))
    }
    #[cfg(not(windows))]
    {
        directories::BaseDirs::new().map(|dirs| {
            dirs.home_dir()
                .join(".config/gcloud/application_default_credentials.json")
        })
    }
}
