use serde::Deserialize;

pub const TOKEN_LIFETIME_SECONDS_DEFAULT: u64 = 15 * 60;
pub const LIFETIME_MARGIN_SECONDS_DEFAULT: u64 = 14 * 60;
pub const FETCH_TIMEOUT_MS_DEFAULT: u64 = 5000;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub database: DatabaseConfig,
}

/// ================================
/// Token refresh settings
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SettingsConfig {
    /// true server-side validity window of an issued token
    pub token_lifetime_seconds: Option<u64>,
    /// a cached token is treated as stale this long after its fetch.
    /// invariant: 0 < lifetime_margin_seconds < token_lifetime_seconds
    pub lifetime_margin_seconds: Option<u64>,
    /// 0 disables the default fetch timeout
    pub fetch_timeout_ms: Option<u64>,
    pub logging: Option<LoggingConfig>,
}

impl SettingsConfig {
    pub fn effective_token_lifetime_seconds(&self) -> u64 {
        self.token_lifetime_seconds.unwrap_or(TOKEN_LIFETIME_SECONDS_DEFAULT)
    }

    /// Configured margin, else the default 14/15 ratio of the token lifetime.
    pub fn effective_lifetime_margin_seconds(&self) -> u64 {
        self.lifetime_margin_seconds.unwrap_or_else(|| {
            self.effective_token_lifetime_seconds().saturating_mul(LIFETIME_MARGIN_SECONDS_DEFAULT)
                / TOKEN_LIFETIME_SECONDS_DEFAULT
        })
    }
}

/// ================================
/// Database handle
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    /// overrides the user part of `uri`
    pub username: Option<String>,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}
