//! Token sources.
//!
//! Each adapter normalizes one collaborator into the uniform [`TokenSource`]
//! shape consumed by the resolver. Adapters are injected as trait objects so
//! tests can substitute fakes without any global strategy state.

use async_trait::async_trait;
use thiserror::Error;

use crate::ambient::DetectError;
use crate::oauth::OAuthError;
use crate::store::{Secret, StoreError};

mod ambient;
mod gcloud;
mod store;

pub use ambient::AmbientSource;
pub use gcloud::{CommandRunner, GcloudSource, SdkCommand, CONFIG_HELPER_ARGS};
pub use store::StoreSource;

/// The kinds of token source that can appear in the configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSourceKind {
    /// Ambient credentials detected from the environment (`"env"`).
    Ambient,

    /// The gcloud SDK's own credentials (`"gcloud"`, with `"gcloud_sdk"`
    /// kept as a legacy alias).
    GcloudSdk,

    /// The credential store's persisted grant (`"store"`).
    Store,
}

impl TokenSourceKind {
    /// Parse a configured source identifier. Returns `None` for identifiers
    /// this helper does not know; the resolver turns that into a fatal
    /// configuration error.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "env" => Some(Self::Ambient),
            "gcloud" | "gcloud_sdk" => Some(Self::GcloudSdk),
            "store" => Some(Self::Store),
            _ => None,
        }
    }

    /// The canonical configuration identifier.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ambient => "env",
            Self::GcloudSdk => "gcloud",
            Self::Store => "store",
        }
    }
}

/// Error type for a single source's token fetch.
///
/// These are ordinarily non-fatal: the resolver records them and moves on to
/// the next configured source. Only the final error of an exhausted pass
/// reaches the caller, where [`SourceError::RevokedGrant`] is the one shape
/// that triggers interactive reauthentication.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Ambient detection itself failed.
    #[error("failed to detect default credentials: {0}")]
    InvalidCredentials(DetectError),

    /// A token was produced but is not usable.
    #[error("token was invalid")]
    InvalidToken,

    /// An ambient token carried an unexpected type tag.
    #[error("expected token type \"Bearer\" but got \"{got}\"")]
    UnexpectedTokenType { got: String },

    /// The backing grant was revoked; only interactive reauthentication can
    /// recover.
    #[error("stored grant has been revoked: {0}")]
    RevokedGrant(OAuthError),

    /// The gcloud SDK invocation failed.
    #[error("`gcloud config config-helper` failed: {0}")]
    ExternalTool(std::io::Error),

    /// The gcloud SDK produced no token.
    #[error("`gcloud config config-helper` returned an empty access_token")]
    EmptyToken,

    /// The credential store could not be read.
    #[error("failed to read the credential store: {0}")]
    StoreRead(#[from] StoreError),

    /// The stored credential could not be refreshed.
    #[error("failed to refresh the stored credential: {0}")]
    TokenRefresh(OAuthError),

    /// A collaborator error surfaced verbatim.
    #[error(transparent)]
    Upstream(DetectError),
}

/// A single token source, normalized to one fetch operation.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Try to produce an access token.
    async fn fetch(&self) -> Result<Secret, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_configured_identifiers() {
        assert_eq!(TokenSourceKind::from_name("env"), Some(TokenSourceKind::Ambient));
        assert_eq!(TokenSourceKind::from_name("gcloud"), Some(TokenSourceKind::GcloudSdk));
        assert_eq!(TokenSourceKind::from_name("store"), Some(TokenSourceKind::Store));
    }

    #[test]
    fn legacy_alias_maps_to_gcloud() {
        assert_eq!(
            TokenSourceKind::from_name("gcloud_sdk"),
            Some(TokenSourceKind::GcloudSdk)
        );
    }

    #[test]
    fn unknown_identifiers_do_not_parse() {
        assert_eq!(TokenSourceKind::from_name("vault"), None);
        assert_eq!(TokenSourceKind::from_name(""), None);
        assert_eq!(TokenSourceKind::from_name("ENV"), None);
    }
}
