use std::path::Path;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::settings::{
    LoggingConfig, ServiceConfig, FETCH_TIMEOUT_MS_DEFAULT, TOKEN_LIFETIME_SECONDS_DEFAULT,
};
use crate::config::validator;

/// Load, expand and validate config from a YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config file {}", path.display()))?;

    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let mut service_config: ServiceConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))
        .map_err(|e| anyhow!("Invalid config format: {}", e))?;

    // Apply defaults
    let settings = &mut service_config.settings;
    settings.token_lifetime_seconds.get_or_insert(TOKEN_LIFETIME_SECONDS_DEFAULT);
    let margin = settings.effective_lifetime_margin_seconds();
    settings.lifetime_margin_seconds.get_or_insert(margin);
    settings.fetch_timeout_ms.get_or_insert(FETCH_TIMEOUT_MS_DEFAULT);
    settings.logging.get_or_insert_with(LoggingConfig::default);

    debug!("validation config ...");
    validator::validate_service_config(&service_config)?;

    Ok(service_config)
}

/// `${VAR}` and `${VAR:default}` are replaced with the environment value,
/// the default, or an empty string.
fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;
    use crate::config::settings::LogFormat;

    const MINIMAL: &str = r#"
database:
  uri: postgres://app_user@db.example.internal:5432/app
"#;

    #[test]
    fn defaults_are_applied() {
        let cfg = parse_config(MINIMAL).unwrap();
        assert_eq!(cfg.settings.token_lifetime_seconds, Some(900));
        assert_eq!(cfg.settings.lifetime_margin_seconds, Some(840));
        assert_eq!(cfg.settings.fetch_timeout_ms, Some(5000));
        let logging = cfg.settings.logging.unwrap();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, LogFormat::Compact);
        assert!(cfg.database.username.is_none());
    }

    #[test]
    fn default_margin_follows_configured_lifetime() {
        let yaml = r#"
settings:
  token_lifetime_seconds: 600
database:
  uri: postgres://app_user@db:5432/app
"#;
        let cfg = parse_config(yaml).unwrap();
        assert_eq!(cfg.settings.token_lifetime_seconds, Some(600));
        assert_eq!(cfg.settings.lifetime_margin_seconds, Some(560));
    }

    #[test]
    fn margin_not_below_lifetime_is_rejected() {
        let yaml = r#"
settings:
  token_lifetime_seconds: 900
  lifetime_margin_seconds: 900
database:
  uri: postgres://app_user@db:5432/app
"#;
        let err = parse_config(yaml).unwrap_err().to_string();
        assert!(err.contains("lifetime_margin_seconds"), "{}", err);
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        let err = parse_config("database: [").unwrap_err().to_string();
        assert!(err.starts_with("Invalid config format"), "{}", err);
    }

    #[test]
    #[serial]
    fn env_vars_are_expanded_with_defaults() {
        std::env::set_var("RDSIAM_TEST_DB_HOST", "writer.cluster.local");
        std::env::remove_var("RDSIAM_TEST_DB_PORT");
        let out = expand_env_vars("postgres://u@${RDSIAM_TEST_DB_HOST}:${RDSIAM_TEST_DB_PORT:6432}/db")
            .unwrap();
        assert_eq!(out, "postgres://u@writer.cluster.local:6432/db");
        std::env::remove_var("RDSIAM_TEST_DB_HOST");
    }

    #[test]
    #[serial]
    fn empty_default_expands_to_empty_string() {
        std::env::remove_var("RDSIAM_TEST_DB_OPTIONS");
        let out = expand_env_vars("postgres://u@db/app?${RDSIAM_TEST_DB_OPTIONS:}").unwrap();
        assert_eq!(out, "postgres://u@db/app?");
    }

    #[tokio::test]
    #[serial]
    async fn loads_config_from_file() {
        std::env::set_var("RDSIAM_TEST_DB_USER", "reporting");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
settings:
  lifetime_margin_seconds: 600
  logging:
    level: debug
    format: json
database:
  uri: postgresql://db.example.internal/app
  username: ${{RDSIAM_TEST_DB_USER}}
"#
        )
        .unwrap();

        let cfg = file_to_config(file.path()).await.unwrap();
        assert_eq!(cfg.settings.lifetime_margin_seconds, Some(600));
        assert_eq!(cfg.database.username.as_deref(), Some("reporting"));
        assert_eq!(cfg.settings.logging.unwrap().format, LogFormat::Json);
        std::env::remove_var("RDSIAM_TEST_DB_USER");
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let err = file_to_config(Path::new("/nonexistent/rds-iam.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
