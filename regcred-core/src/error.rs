//! Top-level error type for the credential helper.

use thiserror::Error;

use crate::config::ConfigError;
use crate::reauth::LoginError;
use crate::resolver::ResolveError;
use crate::store::StoreError;

/// Everything the helper facade can report to its caller.
#[derive(Debug, Error)]
pub enum HelperError {
    /// Token resolution failed across every configured source.
    #[error("could not retrieve registry access token: {0}")]
    Resolve(#[from] ResolveError),

    /// The interactive reauthentication flow failed.
    #[error("unable to authenticate user: {0}")]
    AuthenticationFailed(LoginError),

    /// Reauthentication succeeded but the new grant could not be saved.
    #[error("unable to persist the new credential: {0}")]
    Persist(StoreError),

    /// The configured token source list is empty.
    #[error("no token sources are configured")]
    NoSources,

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The operation is not part of this helper's contract.
    #[error("{op} is unimplemented")]
    Unimplemented { op: &'static str },
}
