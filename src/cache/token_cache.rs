use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::cache::fetch_context::FetchContext;
use crate::cache::token::CachedToken;
use crate::config::settings::{SettingsConfig, FETCH_TIMEOUT_MS_DEFAULT};
use crate::error::{IdentityResolutionError, TokenFetchError};
use crate::helpers::time::{get_instant, get_lifetime_margin, unix_after};
use crate::identity::{DbIdentity, IdentityResolver, ResolvedIdentity, TokenIssuer, TokenRequest};
use crate::observability::metrics::get_metrics;

/// How long a fetched token is served, and how long a fetch may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Must stay below the token's true validity window to absorb clock
    /// drift and connection-establishment latency.
    pub lifetime_margin: Duration,
    pub fetch_timeout: Option<Duration>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from_settings(&SettingsConfig::default())
    }
}

impl RefreshPolicy {
    pub fn new(lifetime_margin: Duration) -> Self {
        Self {
            lifetime_margin,
            fetch_timeout: Some(Duration::from_millis(FETCH_TIMEOUT_MS_DEFAULT)),
        }
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Option<Duration>) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn from_settings(settings: &SettingsConfig) -> Self {
        let fetch_timeout = match settings.fetch_timeout_ms.unwrap_or(FETCH_TIMEOUT_MS_DEFAULT) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        Self {
            lifetime_margin: get_lifetime_margin(settings),
            fetch_timeout,
        }
    }
}

/// Self-refreshing cache of a single IAM authentication token.
///
/// One instance per logical database handle. The `(token, expiry)` pair sits
/// behind a reader/writer lock; the issuer is always called outside the lock.
pub struct TokenCache<I: TokenIssuer> {
    identity: DbIdentity,
    endpoint: String,
    resolved: ResolvedIdentity<I::Credentials>,
    issuer: I,
    policy: RefreshPolicy,
    state: RwLock<Option<CachedToken>>,
}

impl<I: TokenIssuer> TokenCache<I> {
    /// Resolve the ambient identity once and build an empty cache.
    pub async fn new<R>(
        identity: DbIdentity,
        resolver: &R,
        issuer: I,
        policy: RefreshPolicy,
    ) -> Result<Self, IdentityResolutionError>
    where
        R: IdentityResolver<Credentials = I::Credentials>,
    {
        let resolved = resolver
            .resolve()
            .await
            .map_err(IdentityResolutionError::new)?;
        info!(
            "resolved identity for '{}' at '{}', region '{}'",
            identity.username,
            identity.endpoint(),
            resolved.region
        );
        Ok(Self::from_resolved(identity, resolved, issuer, policy))
    }

    pub fn from_resolved(
        identity: DbIdentity,
        resolved: ResolvedIdentity<I::Credentials>,
        issuer: I,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            endpoint: identity.endpoint(),
            identity,
            resolved,
            issuer,
            policy,
            state: RwLock::new(None),
        }
    }

    pub fn identity(&self) -> &DbIdentity {
        &self.identity
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Currently valid token, fetched with the policy's default timeout.
    pub async fn get_token(&self) -> Result<String, TokenFetchError> {
        self.get_token_with(&FetchContext::default()).await
    }

    /// Currently valid token, fetched under the caller's deadline/cancellation.
    ///
    /// Concurrent callers that all find the token stale each fetch on their own
    /// and each return the token they fetched; the last write wins the cache.
    /// Every fetched token is valid, so no fetch de-duplication is done.
    pub async fn get_token_with(&self, ctx: &FetchContext) -> Result<String, TokenFetchError> {
        let metrics = get_metrics().await;

        {
            let state = self.state.read().await;
            if let Some(cached) = state.as_ref().filter(|t| t.is_fresh_at(get_instant())) {
                metrics.token_cache_hits.with_label_values(&[self.endpoint.as_str()]).inc();
                debug!("serving cached token for '{}'", self.endpoint);
                return Ok(cached.value.clone());
            }
        }

        let fetched = self.fetch(ctx).await?;
        let value = fetched.value.clone();
        let expires_at_unix = fetched.expires_at_unix;

        *self.state.write().await = Some(fetched);

        metrics.token_expiry_unix.with_label_values(&[self.endpoint.as_str()]).set(expires_at_unix);
        info!(
            "refreshed token for '{}', stale after {} (UNIX)",
            self.endpoint, expires_at_unix
        );
        Ok(value)
    }

    /// Copy of the stored pair, read under the shared lock.
    pub async fn snapshot(&self) -> Option<CachedToken> {
        self.state.read().await.clone()
    }

    /// Drop the stored pair so the next call fetches.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
        debug!("invalidated cached token for '{}'", self.endpoint);
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<CachedToken, TokenFetchError> {
        let metrics = get_metrics().await;
        let started = get_instant();
        let expires_at_unix = unix_after(self.policy.lifetime_margin);
        metrics.token_fetch_requests.with_label_values(&[self.endpoint.as_str()]).inc();

        let result = match &ctx.cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TokenFetchError::Cancelled {
                    endpoint: self.endpoint.clone(),
                }),
                issued = self.issue(ctx, started) => issued,
            },
            None => self.issue(ctx, started).await,
        };

        metrics
            .token_fetch_duration
            .with_label_values(&[self.endpoint.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(value) => Ok(CachedToken::new(
                value,
                started + self.policy.lifetime_margin,
                expires_at_unix,
            )),
            Err(err) => {
                metrics
                    .token_fetch_failures
                    .with_label_values(&[self.endpoint.as_str(), err.reason()])
                    .inc();
                warn!("token fetch for '{}' failed: {}", self.endpoint, err);
                Err(err)
            }
        }
    }

    async fn issue(&self, ctx: &FetchContext, started: Instant) -> Result<String, TokenFetchError> {
        let request = TokenRequest {
            endpoint: &self.endpoint,
            region: &self.resolved.region,
            username: &self.identity.username,
            credentials: &self.resolved.credentials,
        };
        let issuing = self.issuer.build_auth_token(request);

        let issued = match ctx.effective_deadline(started, self.policy.fetch_timeout) {
            Some(deadline) => match timeout_at(deadline, issuing).await {
                Ok(issued) => issued,
                Err(_) => {
                    return Err(TokenFetchError::Timeout {
                        endpoint: self.endpoint.clone(),
                        elapsed: started.elapsed(),
                    })
                }
            },
            None => issuing.await,
        };

        match issued {
            Ok(value) if value.is_empty() => Err(TokenFetchError::EmptyToken {
                endpoint: self.endpoint.clone(),
            }),
            Ok(value) => Ok(value),
            Err(source) => Err(TokenFetchError::Issuer {
                endpoint: self.endpoint.clone(),
                source,
            }),
        }
    }
}
