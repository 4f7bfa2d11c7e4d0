use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{LogFormat, LoggingConfig, ServiceConfig};

const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Resolve the effective logging config: `LOG_LEVEL` wins over the
/// configured level, an absent logging block falls back to info/compact.
pub fn resolve_logging_config(service_config: &ServiceConfig) -> LoggingConfig {
    let configured = service_config
        .settings
        .logging
        .to_owned()
        .unwrap_or_default();

    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or(configured.level);

    LoggingConfig::new(level.to_lowercase(), configured.format)
}

/// Initialize tracing with the desired config.
/// A subscriber installed earlier (by the host application) is left in place.
pub fn init_logging(cfg: &LoggingConfig) {
    let env_filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Base layer: filter + writer
    let registry = tracing_subscriber::registry().with(env_filter);

    // Choose format layer
    match cfg.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .flatten_event(true)
                .with_ansi(false);

            let _ = registry.with(layer).try_init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_timer(UtcTime::rfc_3339())
                .with_ansi(true);

            let _ = registry.with(layer).try_init();
        }
    };
}
