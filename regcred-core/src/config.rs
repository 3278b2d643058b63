//! Helper configuration.
//!
//! All process-wide constants — the canonical username, the OAuth scopes,
//! the token endpoint, the source order — live here as plain values handed
//! to the resolver at construction. Nothing in the pipeline reads ambient
//! globals.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oauth::GOOGLE_TOKEN_ENDPOINT;

/// Username paired with every resolved access token. GCR-style registries
/// accept any OAuth2 access token under this fixed identity.
pub const OAUTH_USERNAME: &str = "oauth2accesstoken";

/// Scope requested for resolved tokens.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config from {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Immutable configuration for the token pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Ordered token source identifiers; consumed strictly in this order.
    #[serde(default = "default_token_sources")]
    pub token_sources: Vec<String>,

    /// Username reported alongside every secret.
    #[serde(default = "default_username")]
    pub username: String,

    /// OAuth scopes requested for tokens.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Token endpoint used to refresh grants.
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,

    /// Prefer self-signed JWTs during ambient detection where supported.
    #[serde(default = "default_true")]
    pub use_self_signed_jwt: bool,
}

fn default_token_sources() -> Vec<String> {
    vec!["env".to_string(), "store".to_string()]
}

fn default_username() -> String {
    OAUTH_USERNAME.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![CLOUD_PLATFORM_SCOPE.to_string()]
}

fn default_token_endpoint() -> String {
    GOOGLE_TOKEN_ENDPOINT.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            token_sources: default_token_sources(),
            username: default_username(),
            scopes: default_scopes(),
            token_endpoint: default_token_endpoint(),
            use_self_signed_jwt: true,
        }
    }
}

/// Load configuration from the default location, or defaults when no config
/// file exists.
pub fn load_config() -> Result<HelperConfig, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => load_config_from(path),
        _ => Ok(HelperConfig::default()),
    }
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: impl Into<PathBuf>) -> Result<HelperConfig, ConfigError> {
    let path = path.into();
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// `config.toml` under the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "regcred", "regcred").map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_env_then_store() {
        let config = HelperConfig::default();
        assert_eq!(config.token_sources, vec!["env", "store"]);
        assert_eq!(config.username, OAUTH_USERNAME);
        assert_eq!(config.scopes, vec![CLOUD_PLATFORM_SCOPE]);
        assert_eq!(config.token_endpoint, GOOGLE_TOKEN_ENDPOINT);
        assert!(config.use_self_signed_jwt);
    }

    #[test]
    fn partial_config_file_falls_back_per_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "token_sources = [\"gcloud\"]\n").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.token_sources, vec!["gcloud"]);
        assert_eq!(config.username, OAUTH_USERNAME);
    }

    #[test]
    fn malformed_config_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "token_sources = not-a-list").unwrap();

        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config_from(dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
