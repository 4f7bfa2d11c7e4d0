//! # RDS IAM Token Library
//!
//! Caches short-lived database IAM authentication tokens and injects them
//! as the password right before each physical connection is opened.
//!
//! Modules:
//! - `cache` - the self-refreshing token cache
//! - `hook` - before-connect hook and handle opening
//! - `identity` - identity parameters and the resolver/issuer collaborators
//! - `config` - YAML configuration, defaults and validation
//! - `observability` - prometheus metrics

pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod hook;
pub mod identity;
pub mod observability;
pub mod tests;
pub mod utils;

pub use crate::cache::fetch_context::FetchContext;
pub use crate::cache::token_cache::{RefreshPolicy, TokenCache};
pub use crate::config::settings::ServiceConfig;
pub use crate::error::{IdentityResolutionError, OpenError, TokenFetchError};
pub use crate::hook::connection_hook::{ConnectParams, ConnectionHook, PasswordField};
pub use crate::hook::connector::{open_iam, IamConnector};
pub use crate::identity::{DbIdentity, IdentityResolver, ResolvedIdentity, TokenIssuer, TokenRequest};
