use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use url::Url;

use crate::cache::fetch_context::FetchContext;
use crate::cache::token_cache::{RefreshPolicy, TokenCache};
use crate::config::settings::{DatabaseConfig, SettingsConfig};
use crate::config::validator;
use crate::error::{OpenError, TokenFetchError};
use crate::hook::connection_hook::{ConnectParams, ConnectionHook};
use crate::identity::{DbIdentity, IdentityResolver, TokenIssuer};

const POSTGRES_DEFAULT_PORT: u16 = 5432;
const MYSQL_DEFAULT_PORT: u16 = 3306;
const CONNECT_TIMEOUT_PARAM: &str = "connect_timeout";

/// A logical database handle: base connection parameters plus the hook that
/// supplies a fresh password for every physical connection.
pub struct IamConnector<I: TokenIssuer> {
    base: ConnectParams,
    hook: ConnectionHook<I>,
}

impl<I: TokenIssuer> IamConnector<I> {
    pub fn new(base: ConnectParams, hook: ConnectionHook<I>) -> Self {
        Self { base, hook }
    }

    pub fn base(&self) -> &ConnectParams {
        &self.base
    }

    pub fn hook(&self) -> &ConnectionHook<I> {
        &self.hook
    }

    /// Parameters for the next physical connection, password included.
    pub async fn connect_params(&self) -> Result<ConnectParams, TokenFetchError> {
        let mut params = self.base.clone();
        self.hook.before_connect(&mut params).await?;
        Ok(params)
    }

    pub async fn connect_params_with(&self, ctx: &FetchContext) -> Result<ConnectParams, TokenFetchError> {
        let mut params = self.base.clone();
        self.hook.before_connect_with(&mut params, ctx).await?;
        Ok(params)
    }
}

/// Open an IAM-authenticated handle: parse the uri, resolve the ambient
/// identity once, and wire the token cache into a connection hook.
pub async fn open_iam<R, I>(
    database: &DatabaseConfig,
    settings: &SettingsConfig,
    resolver: &R,
    issuer: I,
) -> Result<IamConnector<I>, OpenError>
where
    R: IdentityResolver<Credentials = I::Credentials>,
    I: TokenIssuer,
{
    let base = parse_connect_params(&database.uri, database.username.as_deref())?;
    validator::check_settings(settings).map_err(OpenError::InvalidSettings)?;
    let identity = DbIdentity::new(base.user.clone(), base.host.clone(), base.port);

    let cache = TokenCache::new(identity, resolver, issuer, RefreshPolicy::from_settings(settings)).await?;
    info!("opened IAM authenticated handle for '{}'", cache.endpoint());

    Ok(IamConnector::new(base, ConnectionHook::new(Arc::new(cache))))
}

/// Connection parameters from a database uri. Any password in the uri is
/// dropped; the hook supplies it per connection.
pub fn parse_connect_params(uri: &str, username: Option<&str>) -> Result<ConnectParams, OpenError> {
    let url = Url::parse(uri).map_err(|e| OpenError::InvalidUri(e.to_string()))?;

    let default_port = match url.scheme() {
        "postgres" | "postgresql" => POSTGRES_DEFAULT_PORT,
        "mysql" => MYSQL_DEFAULT_PORT,
        other => return Err(OpenError::UnsupportedScheme(other.to_owned())),
    };

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| OpenError::InvalidUri("missing host".to_owned()))?
        .to_owned();

    let user = username
        .map(str::to_owned)
        .or_else(|| Some(url.username().to_owned()).filter(|u| !u.is_empty()))
        .ok_or(OpenError::MissingUsername)?;

    let database = Some(url.path().trim_start_matches('/').to_owned()).filter(|db| !db.is_empty());

    let mut connect_timeout = None;
    let mut options = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == CONNECT_TIMEOUT_PARAM {
            let secs: u64 = value.parse().map_err(|_| {
                OpenError::InvalidUri(format!("{} '{}' is not a number of seconds", CONNECT_TIMEOUT_PARAM, value))
            })?;
            // 0 means wait indefinitely
            connect_timeout = Some(Duration::from_secs(secs)).filter(|t| !t.is_zero());
        } else {
            options.push((key.into_owned(), value.into_owned()));
        }
    }

    Ok(ConnectParams {
        host,
        port: url.port().unwrap_or(default_port),
        user,
        password: None,
        database,
        connect_timeout,
        options,
    })
}
