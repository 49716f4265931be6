use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
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
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_positive_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let raw = or_default(var, default);
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(var, format!("must be a positive number, got {raw}")));
        }
        Ok(value)
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                invalid(var, format!("expected true/false, got {raw}"))
            }),
            Err(_) => Ok(default),
        }
    };

    let api_base_url = lookup("BINFINDER_API_BASE_URL")
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());
    if let Some(url) = &api_base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid(
                "BINFINDER_API_BASE_URL",
                format!("must be an http(s) URL, got {url}"),
            ));
        }
    }
    let api_token = lookup("BINFINDER_API_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());

    let env = parse_environment(&or_default("BINFINDER_ENV", "development"))?;
    let log_level = or_default("BINFINDER_LOG_LEVEL", "info");

    let gate_degrees = parse_positive_f64("BINFINDER_GATE_DEGREES", "0.005")?;
    let at_location_meters = parse_positive_f64("BINFINDER_AT_LOCATION_METERS", "6.0")?;
    let offset_step_degrees = parse_positive_f64("BINFINDER_OFFSET_STEP_DEGREES", "0.0002")?;
    let significant_change_meters =
        parse_positive_f64("BINFINDER_SIGNIFICANT_CHANGE_METERS", "2.0")?;
    let fetch_span_degrees = parse_positive_f64("BINFINDER_FETCH_SPAN_DEGREES", "0.01")?;

    let request_timeout_secs = parse_u64("BINFINDER_REQUEST_TIMEOUT_SECS", "15")?;
    let max_retries = parse_u32("BINFINDER_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("BINFINDER_RETRY_BACKOFF_BASE_MS", "500")?;

    let forward_renderer_logs = parse_bool(
        "BINFINDER_FORWARD_RENDERER_LOGS",
        env != Environment::Production,
    )?;
    let debug_overlay = parse_bool("BINFINDER_DEBUG_OVERLAY", false)?;

    Ok(AppConfig {
        api_base_url,
        api_token,
        env,
        log_level,
        gate_degrees,
        at_location_meters,
        offset_step_degrees,
        significant_change_meters,
        fetch_span_degrees,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        forward_renderer_logs,
        debug_overlay,
    })
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
            var: "BINFINDER_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
