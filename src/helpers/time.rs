use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::config::settings::SettingsConfig;

pub fn get_lifetime_margin(settings: &SettingsConfig) -> Duration {
    Duration::from_secs(settings.effective_lifetime_margin_seconds())
}

pub fn now_i64() -> i64 {
    Utc::now().timestamp()
}

/// UNIX seconds `margin` from now, wall clock. Metrics only.
pub fn unix_after(margin: Duration) -> i64 {
    now_i64() + margin.as_secs() as i64
}

/// Monotonic (and test-controllable) instant used for expiry decisions.
pub fn get_instant() -> Instant {
    Instant::now()
}
