use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct QueryLogParams {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct QueryLogItem {
    public_id: Uuid,
    logged_at: DateTime<FixedOffset>,
    query: String,
    status: String,
    message: String,
}

pub(super) async fn list_query_log(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<QueryLogParams>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(pool) = state.pool.as_ref() else {
        return Err(ApiError::new(
            req_id.0,
            "service_unavailable",
            "query log requires a configured database",
        ));
    };

    let rows = nearstore_db::list_query_log(pool, normalize_limit(params.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let items: Vec<QueryLogItem> = rows
        .into_iter()
        .map(|row| QueryLogItem {
            public_id: row.public_id,
            logged_at: row.local_logged_at(),
            query: row.query,
            status: row.status,
            message: row.message,
        })
        .collect();

    Ok(Json(ApiResponse::new(req_id.0, items)))
}
