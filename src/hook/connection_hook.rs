use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::fetch_context::FetchContext;
use crate::cache::token_cache::TokenCache;
use crate::error::TokenFetchError;
use crate::identity::TokenIssuer;
use crate::observability::metrics::get_metrics;

/// The driver-side connection parameters the hook writes into.
/// Only the password is ever written.
pub trait PasswordField {
    fn set_password(&mut self, password: String);

    /// Time the driver allows for the whole connection attempt.
    fn connect_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Parameters for one physical connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: Option<String>,
    pub connect_timeout: Option<Duration>,
    /// remaining uri query parameters, passed through untouched
    pub options: Vec<(String, String)>,
}

impl PasswordField for ConnectParams {
    fn set_password(&mut self, password: String) {
        self.password = Some(password);
    }

    fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .field("options", &self.options)
            .finish()
    }
}

/// Injects a currently valid token as the password right before each
/// physical connection. Cheap to clone; clones share one cache.
pub struct ConnectionHook<I: TokenIssuer> {
    cache: Arc<TokenCache<I>>,
}

impl<I: TokenIssuer> Clone for ConnectionHook<I> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<I: TokenIssuer> ConnectionHook<I> {
    pub fn new(cache: Arc<TokenCache<I>>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<TokenCache<I>> {
        &self.cache
    }

    /// The fetch deadline follows the driver's connect timeout, if any.
    pub async fn before_connect<P: PasswordField>(&self, params: &mut P) -> Result<(), TokenFetchError> {
        let ctx = match params.connect_timeout() {
            Some(timeout) => FetchContext::new().with_timeout(timeout),
            None => FetchContext::new(),
        };
        self.before_connect_with(params, &ctx).await
    }

    /// On error the parameters are left untouched and the connection attempt
    /// should be aborted.
    pub async fn before_connect_with<P: PasswordField>(
        &self,
        params: &mut P,
        ctx: &FetchContext,
    ) -> Result<(), TokenFetchError> {
        let result = self.cache.get_token_with(ctx).await;

        get_metrics()
            .await
            .hook_invocations
            .with_label_values(&[self.cache.endpoint(), if result.is_ok() { "ok" } else { "error" }])
            .inc();

        let token = result?;
        params.set_password(token);
        debug!("password injected for connection to '{}'", self.cache.endpoint());
        Ok(())
    }
}
