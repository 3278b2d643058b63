//! # Regcred Core
//!
//! Core library for the `regcred` Docker credential helper.
//!
//! This crate provides:
//! - The access-token model and its validity rule
//! - Token source adapters (ambient credentials, the gcloud SDK, the
//!   credential store) behind a uniform [`TokenSource`] trait
//! - [`TokenResolver`] - ordered multi-source resolution with first-success
//!   short-circuiting
//! - [`ReauthCoordinator`] - the interactive reauthentication recovery flow
//!   for revoked grants
//! - [`CredentialHelper`] - the Docker credential-helper facade
//! - File, in-memory and (optionally) keyring-backed credential stores
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use regcred_core::{CredentialHelper, HelperConfig, RegistryHelper};
//!
//! async fn get_secret(helper: &RegistryHelper) -> Result<String, regcred_core::HelperError> {
//!     let creds = helper.get("https://gcr.io").await?;
//!     Ok(creds.secret.expose().to_string())
//! }
//! ```

pub mod ambient;
pub mod config;
pub mod error;
pub mod helper;
pub mod oauth;
pub mod reauth;
pub mod resolver;
pub mod sources;
pub mod store;
pub mod token;

// Re-export commonly used types at crate root
pub use config::{
    HelperConfig,
    ConfigError,
    load_config,
    load_config_from,
    OAUTH_USERNAME,
    CLOUD_PLATFORM_SCOPE,
};

pub use oauth::{OAuthError, TokenEndpointErrorBody, GOOGLE_TOKEN_ENDPOINT};

pub use store::{
    Secret,
    StoredAuth,
    CredentialStore,
    StoreError,
    FileStore,
    MemoryStore,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use token::{Token, EXPIRY_SKEW_SECS};

pub use ambient::{
    AmbientCredentials,
    AdcDetector,
    DetectedCredential,
    DetectOptions,
    DetectError,
};

pub use sources::{
    TokenSource,
    TokenSourceKind,
    SourceError,
    AmbientSource,
    GcloudSource,
    StoreSource,
    CommandRunner,
    SdkCommand,
};

pub use resolver::{TokenResolver, ResolveError};

pub use reauth::{
    ReauthCoordinator,
    LoginAgent,
    LoginError,
    StatusSink,
    StderrStatus,
};

pub use helper::{CredentialHelper, Credentials, RegistryHelper};

pub use error::HelperError;
