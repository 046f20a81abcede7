use std::str::FromStr;

use crate::app_config::{AppConfig, EngineSettings, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let defaults = EngineSettings::default();

    let api_base_url = require("ADSCOPE_API_BASE_URL")?;
    let api_token = lookup("ADSCOPE_API_TOKEN").ok().filter(|t| !t.is_empty());
    let env = parse_environment(&or_default("ADSCOPE_ENV", "development"))?;
    let log_level = or_default("ADSCOPE_LOG_LEVEL", "info");
    let request_timeout_secs = parse_var(&lookup, "ADSCOPE_REQUEST_TIMEOUT_SECS", 30_u64)?;

    let engine = EngineSettings {
        concurrency_limit: parse_var(
            &lookup,
            "ADSCOPE_CONCURRENCY_LIMIT",
            defaults.concurrency_limit,
        )?,
        keywords_page_size: parse_var(
            &lookup,
            "ADSCOPE_KEYWORDS_PAGE_SIZE",
            defaults.keywords_page_size,
        )?,
        max_conflicts_per_campaign: parse_var(
            &lookup,
            "ADSCOPE_MAX_CONFLICTS_PER_CAMPAIGN",
            defaults.max_conflicts_per_campaign,
        )?,
        max_total_conflicts: parse_var(
            &lookup,
            "ADSCOPE_MAX_TOTAL_CONFLICTS",
            defaults.max_total_conflicts,
        )?,
        max_ids_per_request: parse_var(
            &lookup,
            "ADSCOPE_MAX_IDS_PER_REQUEST",
            defaults.max_ids_per_request,
        )?,
        max_page_size: parse_var(&lookup, "ADSCOPE_MAX_PAGE_SIZE", defaults.max_page_size)?,
        max_concurrency: parse_var(&lookup, "ADSCOPE_MAX_CONCURRENCY", defaults.max_concurrency)?,
        retry_max_attempts: parse_var(
            &lookup,
            "ADSCOPE_RETRY_MAX_ATTEMPTS",
            defaults.retry_max_attempts,
        )?,
        retry_initial_delay_ms: parse_var(
            &lookup,
            "ADSCOPE_RETRY_INITIAL_DELAY_MS",
            defaults.retry_initial_delay_ms,
        )?,
        retry_backoff_base: parse_var(
            &lookup,
            "ADSCOPE_RETRY_BACKOFF_BASE",
            defaults.retry_backoff_base,
        )?,
        retry_max_delay_ms: parse_var(
            &lookup,
            "ADSCOPE_RETRY_MAX_DELAY_MS",
            defaults.retry_max_delay_ms,
        )?,
        retry_jitter: parse_var(&lookup, "ADSCOPE_RETRY_JITTER", defaults.retry_jitter)?,
        attempt_timeout_secs: parse_var(
            &lookup,
            "ADSCOPE_ATTEMPT_TIMEOUT_SECS",
            defaults.attempt_timeout_secs,
        )?,
        shared_list_timeout_secs: parse_var(
            &lookup,
            "ADSCOPE_SHARED_LIST_TIMEOUT_SECS",
            defaults.shared_list_timeout_secs,
        )?,
        analysis_timeout_secs: parse_var(
            &lookup,
            "ADSCOPE_ANALYSIS_TIMEOUT_SECS",
            defaults.analysis_timeout_secs,
        )?,
    };

    validate_engine_settings(&engine)?;

    Ok(AppConfig {
        env,
        log_level,
        api_base_url,
        api_token,
        request_timeout_secs,
        engine,
    })
}

/// Parses `var` with `FromStr`, falling back to `default` when unset.
fn parse_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Rejects settings that would make every analysis fail at the guard.
fn validate_engine_settings(engine: &EngineSettings) -> Result<(), ConfigError> {
    let invalid = |var: &str, reason: &str| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.to_string(),
    };

    if engine.max_concurrency == 0 {
        return Err(invalid("ADSCOPE_MAX_CONCURRENCY", "must be at least 1"));
    }
    if engine.concurrency_limit == 0 || engine.concurrency_limit > engine.max_concurrency {
        return Err(invalid(
            "ADSCOPE_CONCURRENCY_LIMIT",
            "must be between 1 and ADSCOPE_MAX_CONCURRENCY",
        ));
    }
    if engine.max_page_size == 0 {
        return Err(invalid("ADSCOPE_MAX_PAGE_SIZE", "must be at least 1"));
    }
    if engine.keywords_page_size == 0 || engine.keywords_page_size > engine.max_page_size {
        return Err(invalid(
            "ADSCOPE_KEYWORDS_PAGE_SIZE",
            "must be between 1 and ADSCOPE_MAX_PAGE_SIZE",
        ));
    }
    if engine.max_ids_per_request == 0 {
        return Err(invalid("ADSCOPE_MAX_IDS_PER_REQUEST", "must be at least 1"));
    }
    if engine.retry_max_attempts == 0 {
        return Err(invalid("ADSCOPE_RETRY_MAX_ATTEMPTS", "must be at least 1"));
    }
    if !engine.retry_backoff_base.is_finite() || engine.retry_backoff_base < 1.0 {
        return Err(invalid(
            "ADSCOPE_RETRY_BACKOFF_BASE",
            "must be a finite number >= 1.0",
        ));
    }
    Ok(())
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for unrecognized values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "ADSCOPE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
