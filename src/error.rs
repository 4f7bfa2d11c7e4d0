use std::time::Duration;

use thiserror::Error;

/// Ambient environment could not supply region or credentials.
/// Fatal for the logical handle being opened, never retried here.
#[derive(Debug, Error)]
#[error("failed to resolve ambient identity: {source}")]
pub struct IdentityResolutionError {
    #[source]
    pub source: anyhow::Error,
}

impl IdentityResolutionError {
    pub fn new(source: anyhow::Error) -> Self {
        Self { source }
    }
}

/// A token fetch did not produce a usable token.
/// Cache state is never modified when one of these is returned.
#[derive(Debug, Error)]
pub enum TokenFetchError {
    #[error("token issuer failed for endpoint '{endpoint}': {source}")]
    Issuer {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("token fetch for endpoint '{endpoint}' timed out after {elapsed:?}")]
    Timeout { endpoint: String, elapsed: Duration },

    #[error("token fetch for endpoint '{endpoint}' was cancelled")]
    Cancelled { endpoint: String },

    #[error("token issuer returned an empty token for endpoint '{endpoint}'")]
    EmptyToken { endpoint: String },
}

impl TokenFetchError {
    /// Short label used as the `reason` metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenFetchError::Issuer { .. } => "issuer",
            TokenFetchError::Timeout { .. } => "timeout",
            TokenFetchError::Cancelled { .. } => "cancelled",
            TokenFetchError::EmptyToken { .. } => "empty_token",
        }
    }
}

/// Failures while opening an IAM-authenticated database handle.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("invalid database uri: {0}")]
    InvalidUri(String),

    #[error("unsupported database uri scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("database username is neither configured nor present in the uri")]
    MissingUsername,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Identity(#[from] IdentityResolutionError),
}
