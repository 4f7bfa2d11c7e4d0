//! Configuration validation with aggregated errors.
//! Every issue is collected before failing so one run reports them all.

use anyhow::{bail, Result};
use tracing::{error, info};

use crate::config::settings::{DatabaseConfig, ServiceConfig, SettingsConfig};

const MAX_TOKEN_LIFETIME_SECONDS: u64 = 15 * 60;

pub fn validate_service_config(cfg: &ServiceConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_database(&cfg.database, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        return Ok(());
    }

    error!("configuration validation errors ({}):", errors.len());
    for e in &errors {
        error!(" - {}", e);
    }
    bail!(
        "config is not valid, total errors:{}, \n{}",
        errors.len(),
        errors.join("\n")
    )
}

/// Settings alone, for callers that build `SettingsConfig` without the loader.
pub fn check_settings(settings: &SettingsConfig) -> Result<(), String> {
    let mut errors: Vec<String> = Vec::new();
    validate_settings(settings, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// SETTINGS VALIDATION
/// Checks the effective values, so an absent field is judged by its default.
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    let lifetime = settings.effective_token_lifetime_seconds();
    if lifetime == 0 || lifetime > MAX_TOKEN_LIFETIME_SECONDS {
        errors.push(format!(
            "settings.token_lifetime_seconds ({}) must be in 1..={}",
            lifetime, MAX_TOKEN_LIFETIME_SECONDS
        ));
    }

    let margin = settings.effective_lifetime_margin_seconds();
    let origin = if settings.lifetime_margin_seconds.is_some() {
        ""
    } else {
        ", derived from token_lifetime_seconds"
    };
    if margin == 0 {
        errors.push(format!("settings.lifetime_margin_seconds ({}{}) must be > 0", margin, origin));
    }
    if margin >= lifetime {
        errors.push(format!(
            "settings.lifetime_margin_seconds ({}{}) must be < token_lifetime_seconds ({})",
            margin, origin, lifetime
        ));
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_database(database: &DatabaseConfig, errors: &mut Vec<String>) {
    if database.uri.trim().is_empty() {
        errors.push("database.uri cannot be empty".to_string());
    }
    if let Some(username) = &database.username {
        if username.trim().is_empty() {
            errors.push("database.username if present must be non-empty".to_string());
        }
    }
}
