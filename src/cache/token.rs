use std::fmt;

use tokio::time::Instant;

/// The (token, expiry) pair. Always replaced as a whole.
#[derive(Clone)]
pub struct CachedToken {
    pub value: String,
    /// monotonic instant after which `value` must not be served
    pub expires_at: Instant,
    /// wall-clock expiry, UNIX seconds
    pub expires_at_unix: i64,
}

impl CachedToken {
    pub fn new(value: String, expires_at: Instant, expires_at_unix: i64) -> Self {
        Self {
            value,
            expires_at,
            expires_at_unix,
        }
    }

    /// Valid only while non-empty and strictly before its expiry.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        !self.value.is_empty() && self.expires_at > now
    }
}

impl fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("expires_at_unix", &self.expires_at_unix)
            .finish()
    }
}
