mod nearest;
mod query_log;
mod stores;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use nearstore_core::{AppConfig, Candidate};
use nearstore_db::PgQueryLog;
use nearstore_geo::{ClientBuildError, LiveSelector, ViaCepClient};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

pub type AppSelector = LiveSelector<Option<PgQueryLog>>;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no database is configured; query logging is then tracing-only.
    pub pool: Option<PgPool>,
    pub stores: Arc<Vec<Candidate>>,
    /// Held for the whole selection so concurrent requests never overlap upstream calls.
    pub selector: Arc<Mutex<AppSelector>>,
    pub postal: Arc<ViaCepClient>,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if an upstream client cannot be built.
    pub fn new(
        config: &AppConfig,
        pool: Option<PgPool>,
        stores: Vec<Candidate>,
    ) -> Result<Self, ClientBuildError> {
        let log = pool.clone().map(PgQueryLog::new);
        Ok(Self {
            selector: Arc::new(Mutex::new(nearstore_geo::selector_from_config(config, log)?)),
            postal: Arc::new(nearstore_geo::postal_from_config(config)?),
            stores: Arc::new(stores),
            pool,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "unprocessable" => StatusCode::UNPROCESSABLE_ENTITY,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &nearstore_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
}

fn api_router(rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/stores", get(stores::list_stores))
        .route("/api/v1/nearest", post(nearest::find_nearest))
        .route("/api/v1/query-log", get(query_log::list_query_log))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(api_router(rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let Some(pool) = state.pool.as_ref() else {
        return (
            StatusCode::OK,
            Json(ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    database: "disabled",
                },
            )),
        );
    };

    match nearstore_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                req_id.0,
                HealthData {
                    status: "ok",
                    database: "ok",
                },
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::new(
                    req_id.0,
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                )),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::path::PathBuf;

    use chrono::FixedOffset;
    use nearstore_core::{AppConfig, Candidate, Environment};

    use super::{build_app, default_rate_limit_state, AppState};

    /// Config pointing every upstream at `upstream` with no pacing.
    pub(crate) fn test_config(upstream: &str) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            log_level: "debug".to_string(),
            stores_path: PathBuf::from("./config/stores.yaml"),
            database_url: None,
            db_max_connections: 1,
            db_min_connections: 1,
            db_acquire_timeout_secs: 1,
            geocoder_url: upstream.to_string(),
            geocoder_country_codes: None,
            router_url: upstream.to_string(),
            postal_url: format!("{upstream}/ws"),
            http_timeout_secs: 5,
            user_agent: "nearstore-test".to_string(),
            inter_call_delay_ms: 0,
            cache_ttl_secs: 60,
            cache_capacity: 64,
            min_query_chars: 10,
            log_utc_offset: FixedOffset::west_opt(3 * 3600).expect("offset"),
        }
    }

    pub(crate) fn test_stores() -> Vec<Candidate> {
        vec![
            Candidate {
                name: "Savassi".to_string(),
                address: "Rua Pernambuco 1000, Belo Horizonte".to_string(),
            },
            Candidate {
                name: "Barreiro".to_string(),
                address: "Avenida Afonso Vaz de Melo 640, Belo Horizonte".to_string(),
            },
        ]
    }

    pub(crate) fn test_app(upstream: &str) -> axum::Router {
        let state = AppState::new(&test_config(upstream), None, test_stores()).expect("state");
        build_app(state, default_rate_limit_state())
    }
}
