use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation handed down from the caller of a token fetch,
/// usually the driver's connection attempt.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    pub deadline: Option<Instant>,
    pub cancel: Option<CancellationToken>,
}

impl FetchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// The earlier of the caller deadline and `started + default_timeout`.
    pub fn effective_deadline(
        &self,
        started: Instant,
        default_timeout: Option<Duration>,
    ) -> Option<Instant> {
        let policy_deadline = default_timeout.map(|timeout| started + timeout);
        match (self.deadline, policy_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
