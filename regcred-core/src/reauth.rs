//! Reauthentication recovery for revoked grants.
//!
//! When a resolution pass ends with the revoked-grant signature, the user's
//! reauth proof has lapsed and no amount of retrying will help; only an
//! interactive login can mint a new grant. The coordinator drives that flow
//! and then retries resolution exactly once — a second revoked-grant failure
//! is final, so the flow can never loop.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::HelperError;
use crate::resolver::{ResolveError, TokenResolver};
use crate::sources::SourceError;
use crate::store::{CredentialStore, Secret, StoredAuth};

/// Error type for the interactive login collaborator.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Interactive login cannot run here (no browser, no TTY, ...).
    #[error("interactive login is not available: {message}")]
    Unavailable { message: String },

    /// The login flow ran and failed, or the user abandoned it.
    #[error("login flow failed: {message}")]
    Failed { message: String },
}

/// Interactive login collaborator. Blocks until the user completes or
/// abandons the flow; no timeout is imposed here.
#[async_trait]
pub trait LoginAgent: Send + Sync {
    async fn perform_login(&self) -> Result<StoredAuth, LoginError>;
}

/// Sink for user-facing status lines.
///
/// Reauthentication happens in the middle of a protocol exchange whose
/// stdout must stay machine-parseable, so progress lines go through this
/// seam instead; the default writes to stderr.
pub trait StatusSink: Send + Sync {
    fn line(&self, message: &str);
}

/// The default status sink: stderr.
pub struct StderrStatus;

impl StatusSink for StderrStatus {
    fn line(&self, message: &str) {
        eprintln!("{message}");
    }
}

/// Wraps the resolver with the revoked-grant recovery flow.
pub struct ReauthCoordinator {
    resolver: TokenResolver,
    login: Arc<dyn LoginAgent>,
    store: Arc<dyn CredentialStore>,
    status: Arc<dyn StatusSink>,
}

impl ReauthCoordinator {
    pub fn new(
        resolver: TokenResolver,
        login: Arc<dyn LoginAgent>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            resolver,
            login,
            store,
            status: Arc::new(StderrStatus),
        }
    }

    /// Replace the status sink (tests capture the emitted lines).
    pub fn with_status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    /// Resolve a token, recovering from a revoked grant at most once.
    ///
    /// Any failure other than the revoked-grant signature propagates
    /// untouched. On the signature: run the interactive login, persist the
    /// new grant, then resolve once more — and return that second outcome
    /// verbatim, whatever it is.
    pub async fn resolve_with_reauth(&self) -> Result<Option<Secret>, HelperError> {
        match self.resolver.resolve().await {
            Err(ResolveError::Source(SourceError::RevokedGrant(_))) => {
                self.status
                    .line("Reauth required; opening a browser to proceed...");
                let auth = self
                    .login
                    .perform_login()
                    .await
                    .map_err(HelperError::AuthenticationFailed)?;
                // A successful login that cannot be saved is still a failure:
                // the retry below would just hit the same revoked grant.
                self.store
                    .set_auth(&auth)
                    .await
                    .map_err(HelperError::Persist)?;
                self.status.line("Reauth successful!");
                Ok(self.resolver.resolve().await?)
            }
            outcome => Ok(outcome?),
        }
    }
}
