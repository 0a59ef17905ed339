use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::FixedOffset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub stores_path: PathBuf,
    /// Query logging is disabled when no database is configured.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub geocoder_url: String,
    /// Optional ISO 3166-1 alpha-2 filter passed through to the geocoder.
    pub geocoder_country_codes: Option<String>,
    pub router_url: String,
    pub postal_url: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    /// Pause between consecutive external calls inside one selection.
    pub inter_call_delay_ms: u64,
    pub cache_ttl_secs: u64,
    /// Maximum entries held by each of the geocode and route caches.
    pub cache_capacity: usize,
    pub min_query_chars: usize,
    /// Fixed offset used to stamp query-log entries in local civil time.
    pub log_utc_offset: FixedOffset,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("stores_path", &self.stores_path)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("geocoder_url", &self.geocoder_url)
            .field("geocoder_country_codes", &self.geocoder_country_codes)
            .field("router_url", &self.router_url)
            .field("postal_url", &self.postal_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("inter_call_delay_ms", &self.inter_call_delay_ms)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("cache_capacity", &self.cache_capacity)
            .field("min_query_chars", &self.min_query_chars)
            .field("log_utc_offset", &self.log_utc_offset)
            .finish()
    }
}
