use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::Serialize;

use super::{ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct StoreItem {
    name: String,
    address: String,
}

pub(super) async fn list_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let items: Vec<StoreItem> = state
        .stores
        .iter()
        .map(|store| StoreItem {
            name: store.name.clone(),
            address: store.address.clone(),
        })
        .collect();

    Json(ApiResponse::new(req_id.0, items))
}
