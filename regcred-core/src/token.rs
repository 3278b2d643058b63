//! The access-token model and its validity rule.

use chrono::{DateTime, Duration, Utc};

use crate::store::Secret;

/// Margin, in seconds, subtracted from a token's remaining lifetime before
/// it is handed out.
///
/// A token that expires within this window is treated as already expired,
/// covering clock drift between this machine and the registry plus the time
/// the request spends in flight. The margin is deliberately small: metadata
/// servers routinely hand out nearly-expired tokens that are still good for
/// one request, and a larger window would reject them.
pub const EXPIRY_SKEW_SECS: i64 = 10;

/// The skew margin as a [`Duration`].
pub fn expiry_skew() -> Duration {
    Duration::seconds(EXPIRY_SKEW_SECS)
}

/// A bearer access token with its metadata.
#[derive(Debug, Clone)]
pub struct Token {
    /// The token value.
    pub value: Secret,

    /// Token type tag (usually "Bearer").
    pub token_type: String,

    /// When this token expires. A token without an expiry is never usable.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a new bearer token with no expiry.
    pub fn bearer(value: impl Into<String>) -> Self {
        Self {
            value: Secret::new(value),
            token_type: "Bearer".to_string(),
            expires_at: None,
        }
    }

    /// Set the expiry time.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the token type tag.
    pub fn with_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Whether this token can still be used right now.
    ///
    /// A token is usable iff its value is non-empty and it expires strictly
    /// later than now plus [`EXPIRY_SKEW`]. A token with no expiry at all is
    /// not usable.
    pub fn is_usable(&self) -> bool {
        if self.value.expose().is_empty() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > Utc::now() + expiry_skew(),
            None => false,
        }
    }
}
