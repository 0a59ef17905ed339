use chrono::FixedOffset;

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if env values are present but invalid.
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
/// Returns `ConfigError` if env values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every setting has a default, so an empty environment yields a usable
/// development configuration that talks to the public Nominatim, OSRM and
/// `ViaCEP` endpoints and keeps no query log.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("NEARSTORE_ENV", "development"))?;

    let bind_addr = or_default("NEARSTORE_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("NEARSTORE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("NEARSTORE_LOG_LEVEL", "info");
    let stores_path = PathBuf::from(or_default("NEARSTORE_STORES_PATH", "./config/stores.yaml"));
    let database_url = optional("DATABASE_URL");

    let db_max_connections = parse_u32("NEARSTORE_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("NEARSTORE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("NEARSTORE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let geocoder_url = or_default(
        "NEARSTORE_GEOCODER_URL",
        "https://nominatim.openstreetmap.org",
    );
    let geocoder_country_codes = optional("NEARSTORE_GEOCODER_COUNTRY_CODES");
    let router_url = or_default("NEARSTORE_ROUTER_URL", "https://router.project-osrm.org");
    let postal_url = or_default("NEARSTORE_POSTAL_URL", "https://viacep.com.br/ws");

    let http_timeout_secs = parse_u64("NEARSTORE_HTTP_TIMEOUT_SECS", "10")?;
    if http_timeout_secs == 0 {
        return Err(invalid(
            "NEARSTORE_HTTP_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }
    let user_agent = or_default("NEARSTORE_USER_AGENT", "nearstore/0.1 (store-finder)");
    let inter_call_delay_ms = parse_u64("NEARSTORE_INTER_CALL_DELAY_MS", "1000")?;
    let cache_ttl_secs = parse_u64("NEARSTORE_CACHE_TTL_SECS", "3600")?;
    let cache_capacity = or_default("NEARSTORE_CACHE_CAPACITY", "1024")
        .parse::<usize>()
        .map_err(|e| invalid("NEARSTORE_CACHE_CAPACITY", e.to_string()))?;
    if cache_capacity == 0 {
        return Err(invalid(
            "NEARSTORE_CACHE_CAPACITY",
            "must be greater than zero".to_string(),
        ));
    }
    let min_query_chars = or_default("NEARSTORE_MIN_QUERY_CHARS", "10")
        .parse::<usize>()
        .map_err(|e| invalid("NEARSTORE_MIN_QUERY_CHARS", e.to_string()))?;

    let log_utc_offset = parse_utc_offset(&or_default("NEARSTORE_LOG_UTC_OFFSET", "-03:00"))
        .ok_or_else(|| {
            invalid(
                "NEARSTORE_LOG_UTC_OFFSET",
                "expected an offset like -03:00 or +01:00".to_string(),
            )
        })?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        stores_path,
        database_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        geocoder_url,
        geocoder_country_codes,
        router_url,
        postal_url,
        http_timeout_secs,
        user_agent,
        inter_call_delay_ms,
        cache_ttl_secs,
        cache_capacity,
        min_query_chars,
        log_utc_offset,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "NEARSTORE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

/// Parses a `±HH:MM` (or `±HHMM`, or `Z`) UTC offset.
#[must_use]
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
