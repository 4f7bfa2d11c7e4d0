// tests/common/mod.rs
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::time::Instant;

use crate::cache::token_cache::{RefreshPolicy, TokenCache};
use crate::identity::{DbIdentity, IdentityResolver, ResolvedIdentity, TokenIssuer, TokenRequest};

pub const REGION: &str = "eu-central-1";
pub const ACCESS_KEY: &str = "AKIATESTONLY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCredentials(pub String);

/// Resolver returning fixed credentials, or failing when `fail` is set.
pub struct StaticResolver {
    pub fail: bool,
}

impl IdentityResolver for StaticResolver {
    type Credentials = StaticCredentials;

    fn resolve(&self) -> impl Future<Output = Result<ResolvedIdentity<StaticCredentials>>> + Send {
        let fail = self.fail;
        async move {
            if fail {
                return Err(anyhow!("no credentials found in environment"));
            }
            Ok(ResolvedIdentity::new(REGION, StaticCredentials(ACCESS_KEY.to_owned())))
        }
    }
}

/// What the issuer does on one call.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// issue "T<call number>"
    Issue,
    IssueValue(String),
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct Step {
    pub delay: Duration,
    pub outcome: Outcome,
}

impl Step {
    pub fn issue_after(delay: Duration) -> Self {
        Self { delay, outcome: Outcome::Issue }
    }

    pub fn fail_after(delay: Duration, reason: &str) -> Self {
        Self { delay, outcome: Outcome::Fail(reason.to_owned()) }
    }
}

#[derive(Debug, Clone)]
pub struct Issued {
    pub token: String,
    pub started: Instant,
}

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub endpoint: String,
    pub region: String,
    pub username: String,
    pub credentials: StaticCredentials,
}

#[derive(Default)]
struct IssuerState {
    calls: AtomicUsize,
    script: Mutex<VecDeque<Step>>,
    issued: Mutex<Vec<Issued>>,
    seen: Mutex<Vec<SeenRequest>>,
}

/// Scripted issuer. Calls beyond the script issue immediately.
#[derive(Clone, Default)]
pub struct MockIssuer {
    state: Arc<IssuerState>,
}

impl MockIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(steps: Vec<Step>) -> Self {
        let issuer = Self::default();
        issuer.state.script.lock().unwrap().extend(steps);
        issuer
    }

    pub fn push(&self, step: Step) {
        self.state.script.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn issued(&self) -> Vec<Issued> {
        self.state.issued.lock().unwrap().clone()
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.seen.lock().unwrap().clone()
    }
}

impl TokenIssuer for MockIssuer {
    type Credentials = StaticCredentials;

    fn build_auth_token(
        &self,
        request: TokenRequest<'_, StaticCredentials>,
    ) -> impl Future<Output = Result<String>> + Send {
        let state = self.state.clone();
        let seen = SeenRequest {
            endpoint: request.endpoint.to_owned(),
            region: request.region.to_owned(),
            username: request.username.to_owned(),
            credentials: request.credentials.clone(),
        };
        async move {
            let started = Instant::now();
            let call = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
            state.seen.lock().unwrap().push(seen);

            let step = state.script.lock().unwrap().pop_front();
            let step = step.unwrap_or(Step::issue_after(Duration::ZERO));
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }

            let token = match step.outcome {
                Outcome::Issue => format!("T{}", call),
                Outcome::IssueValue(value) => value,
                Outcome::Fail(reason) => return Err(anyhow!(reason)),
            };
            state.issued.lock().unwrap().push(Issued { token: token.clone(), started });
            Ok(token)
        }
    }
}

pub fn identity() -> DbIdentity {
    DbIdentity::new("app_user", "db.example.internal", 5432)
}

pub fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

pub fn build_cache(issuer: &MockIssuer, policy: RefreshPolicy) -> TokenCache<MockIssuer> {
    TokenCache::from_resolved(
        identity(),
        ResolvedIdentity::new(REGION, StaticCredentials(ACCESS_KEY.to_owned())),
        issuer.clone(),
        policy,
    )
}
