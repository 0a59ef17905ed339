//! Offline unit tests for nearstore-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::{FixedOffset, TimeZone, Utc};
use nearstore_core::{AppConfig, Environment, LogStatus};
use nearstore_db::{PoolConfig, QueryLogRow};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        stores_path: PathBuf::from("./config/stores.yaml"),
        database_url: Some("postgres://example".to_string()),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        geocoder_url: "http://geo".to_string(),
        geocoder_country_codes: None,
        router_url: "http://osrm".to_string(),
        postal_url: "http://cep".to_string(),
        http_timeout_secs: 10,
        user_agent: "ua".to_string(),
        inter_call_delay_ms: 0,
        cache_ttl_secs: 60,
        cache_capacity: 16,
        min_query_chars: 10,
        log_utc_offset: FixedOffset::west_opt(3 * 3600).unwrap(),
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

fn row(utc_offset_secs: i32, status: &str) -> QueryLogRow {
    QueryLogRow {
        id: 1,
        public_id: Uuid::new_v4(),
        logged_at: Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap(),
        utc_offset_secs,
        query: "Rua da Bahia 1148".to_string(),
        status: status.to_string(),
        message: "ok".to_string(),
        created_at: Utc::now(),
    }
}

#[test]
fn query_log_row_renders_in_stored_offset() {
    let local = row(-3 * 3600, "success").local_logged_at();
    assert_eq!(local.to_rfc3339(), "2026-03-10T12:30:00-03:00");
}

#[test]
fn query_log_row_parses_status() {
    assert_eq!(
        row(0, "route_timeout").log_status().unwrap(),
        LogStatus::RouteTimeout
    );
    assert!(row(0, "mystery").log_status().is_err());
}

#[tokio::test]
async fn connect_without_database_url_is_missing() {
    let mut config = app_config();
    config.database_url = None;
    let err = nearstore_db::connect_pool_from_config(&config)
        .await
        .unwrap_err();
    assert!(matches!(err, nearstore_db::DbError::MissingDatabaseUrl));
}
