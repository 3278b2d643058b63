//! Ordered multi-source token resolution.

use thiserror::Error;

use crate::sources::{SourceError, TokenSource, TokenSourceKind};
use crate::store::Secret;

/// Error type for a full resolution pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The configured order names a source this helper does not know. A
    /// misconfiguration, not a transient failure: resolution stops here.
    #[error("unknown token source: {kind}")]
    UnknownSourceKind { kind: String },

    /// Every configured source failed; this is the last source's error.
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Tries the configured sources in order and returns the first token.
///
/// Stateless per call: the resolver owns only its configuration and the
/// injected adapters, so it is freely re-entrant.
pub struct TokenResolver {
    order: Vec<String>,
    ambient: Box<dyn TokenSource>,
    gcloud: Box<dyn TokenSource>,
    store: Box<dyn TokenSource>,
}

impl TokenResolver {
    /// Build a resolver over the configured source order and one adapter per
    /// kind.
    pub fn new(
        order: Vec<String>,
        ambient: Box<dyn TokenSource>,
        gcloud: Box<dyn TokenSource>,
        store: Box<dyn TokenSource>,
    ) -> Self {
        Self {
            order,
            ambient,
            gcloud,
            store,
        }
    }

    /// Walk the configured sources in order.
    ///
    /// The first source to produce a token wins and later sources are not
    /// consulted. When every source fails, the error of the **last** source
    /// is returned: in the intended configuration order, later sources are
    /// the more authoritative explanation of the overall failure. An empty
    /// order yields `Ok(None)`; configuration is expected to supply at least
    /// one source, but that is not enforced here.
    pub async fn resolve(&self) -> Result<Option<Secret>, ResolveError> {
        let mut last_err: Option<SourceError> = None;

        for name in &self.order {
            let Some(kind) = TokenSourceKind::from_name(name) else {
                return Err(ResolveError::UnknownSourceKind { kind: name.clone() });
            };
            let source = match kind {
                TokenSourceKind::Ambient => self.ambient.as_ref(),
                TokenSourceKind::GcloudSdk => self.gcloud.as_ref(),
                TokenSourceKind::Store => self.store.as_ref(),
            };

            match source.fetch().await {
                Ok(secret) => {
                    tracing::debug!(source = %name, "token source succeeded");
                    return Ok(Some(secret));
                }
                Err(err) => {
                    tracing::debug!(source = %name, error = %err, "token source failed");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(err.into()),
            None => Ok(None),
        }
    }
}
