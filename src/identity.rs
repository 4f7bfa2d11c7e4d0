//! Identity parameters and the two external collaborators the cache relies on:
//! ambient identity resolution and token issuing.

use std::fmt;
use std::future::Future;

use anyhow::Result;

/// Database identity a token is requested for. Set once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbIdentity {
    pub username: String,
    pub host: String,
    pub port: u16,
}

impl DbIdentity {
    pub fn new(username: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            username: username.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port`, the endpoint string the issuer signs for.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Region and credential provider resolved once from the calling environment.
#[derive(Clone)]
pub struct ResolvedIdentity<C> {
    pub region: String,
    pub credentials: C,
}

impl<C> ResolvedIdentity<C> {
    pub fn new(region: impl Into<String>, credentials: C) -> Self {
        Self {
            region: region.into(),
            credentials,
        }
    }
}

impl<C> fmt::Debug for ResolvedIdentity<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedIdentity")
            .field("region", &self.region)
            .field("credentials", &"<redacted>")
            .finish()
    }
}

/// Everything the issuer needs for one signed token.
#[derive(Debug)]
pub struct TokenRequest<'a, C> {
    pub endpoint: &'a str,
    pub region: &'a str,
    pub username: &'a str,
    pub credentials: &'a C,
}

/// Resolves region and credentials from the ambient environment.
pub trait IdentityResolver: Send + Sync {
    type Credentials: Send + Sync;

    fn resolve(&self) -> impl Future<Output = Result<ResolvedIdentity<Self::Credentials>>> + Send;
}

/// Exchanges (endpoint, region, username, credentials) for a signed,
/// time-limited authentication token. Must be safe to call concurrently.
pub trait TokenIssuer: Send + Sync {
    type Credentials: Send + Sync;

    fn build_auth_token(
        &self,
        request: TokenRequest<'_, Self::Credentials>,
    ) -> impl Future<Output = Result<String>> + Send;
}
