use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Extension, Json,
};
use nearstore_core::{CandidateFailure, Coordinate, ResolvedCandidate, SelectionOutcome};
use nearstore_geo::{PostalError, PostalQueryError, SelectionError};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResponse, AppState};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct NearestRequest {
    address: Option<String>,
    postal_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct NearestData {
    query_address: String,
    query_coordinate: Coordinate,
    store: ResolvedCandidate,
    distance_km: f64,
    duration_secs: f64,
    /// Route geometry as `[lat, lon]` pairs, ready for map polylines.
    display_path: Vec<[f64; 2]>,
    unresolved: Vec<CandidateFailure>,
    unroutable: Vec<CandidateFailure>,
}

impl From<SelectionOutcome> for NearestData {
    fn from(outcome: SelectionOutcome) -> Self {
        Self {
            display_path: outcome.route.display_path(),
            distance_km: outcome.route.distance_km,
            duration_secs: outcome.route.duration_secs,
            query_address: outcome.query_address,
            query_coordinate: outcome.query_coordinate,
            store: outcome.winner,
            unresolved: outcome.unresolved,
            unroutable: outcome.unroutable,
        }
    }
}

pub(super) async fn find_nearest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<NearestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.body_text()))?;

    let selector = state.selector.lock().await;

    let address = match (request.address, request.postal_code) {
        (Some(address), None) => address,
        (None, Some(postal_code)) => selector
            .address_for_postal_code(state.postal.as_ref(), &postal_code)
            .await
            .map_err(|e| map_postal_error(req_id.0.clone(), &e))?,
        _ => {
            return Err(ApiError::new(
                req_id.0,
                "validation_error",
                "provide exactly one of 'address' or 'postal_code'",
            ))
        }
    };

    let outcome = selector
        .select_nearest(&address, &state.stores)
        .await
        .map_err(|e| map_selection_error(req_id.0.clone(), &e))?;
    drop(selector);

    Ok(Json(ApiResponse::new(req_id.0, NearestData::from(outcome))))
}

fn map_selection_error(request_id: String, error: &SelectionError) -> ApiError {
    let code = match error {
        SelectionError::InvalidInput { .. } => "validation_error",
        SelectionError::GeocodingFailed { source: None, .. } => "not_found",
        SelectionError::GeocodingFailed {
            source: Some(_), ..
        } => "upstream_error",
        SelectionError::NoCandidatesAvailable { .. } | SelectionError::NoRouteFound { .. } => {
            "unprocessable"
        }
    };
    ApiError::new(request_id, code, error.to_string())
}

fn map_postal_error(request_id: String, error: &PostalQueryError) -> ApiError {
    let code = match error {
        PostalQueryError::NotFound(_) => "not_found",
        PostalQueryError::Lookup(PostalError::InvalidCode(_)) => "validation_error",
        PostalQueryError::Lookup(_) => "upstream_error",
    };
    ApiError::new(request_id, code, error.to_string())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::test_support::{test_app, test_config, test_stores};
    use crate::api::{build_app, default_rate_limit_state, AppState};

    const QUERY: &str = "Rua da Bahia, 1148, Centro, Belo Horizonte";

    async fn mount_place(server: &MockServer, normalized: &str, lat: &str, lon: &str) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", normalized))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "lat": lat, "lon": lon }])),
            )
            .mount(server)
            .await;
    }

    async fn mount_route(server: &MockServer, route_path: &str, meters: f64) {
        Mock::given(method("GET"))
            .and(path(route_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "code": "Ok",
                "routes": [{
                    "distance": meters,
                    "duration": meters / 10.0,
                    "geometry": { "type": "LineString", "coordinates": [[-43.94, -19.92], [-43.935, -19.935]] }
                }]
            })))
            .mount(server)
            .await;
    }

    async fn mount_stores(server: &MockServer) {
        mount_place(server, "Rua Pernambuco 1000 Belo Horizonte", "-19.935", "-43.935").await;
        mount_place(
            server,
            "Avenida Afonso Vaz de Melo 640 Belo Horizonte",
            "-19.97",
            "-44.02",
        )
        .await;
    }

    async fn mount_happy_routes(server: &MockServer) {
        mount_route(server, "/route/v1/driving/-43.94,-19.92;-43.935,-19.935", 2500.0).await;
        mount_route(server, "/route/v1/driving/-43.94,-19.92;-44.02,-19.97", 12_000.0).await;
    }

    fn post_nearest(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/nearest")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn send(server: &MockServer, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = test_app(&server.uri())
            .oneshot(post_nearest(body))
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json parse"))
    }

    #[tokio::test]
    async fn nearest_by_address_returns_closest_store() {
        let server = MockServer::start().await;
        mount_place(&server, "Rua da Bahia 1148 Centro Belo Horizonte", "-19.92", "-43.94").await;
        mount_stores(&server).await;
        mount_happy_routes(&server).await;

        let (status, json) = send(&server, serde_json::json!({ "address": QUERY })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["store"]["name"], "Savassi");
        assert_eq!(json["data"]["distance_km"], 2.5);
        assert_eq!(json["data"]["display_path"][0][0], -19.92);
        assert_eq!(json["data"]["display_path"][0][1], -43.94);
        assert_eq!(json["data"]["unroutable"].as_array().map(Vec::len), Some(0));
    }

    #[tokio::test]
    async fn nearest_short_address_is_validation_error() {
        let server = MockServer::start().await;
        let (status, json) = send(&server, serde_json::json!({ "address": "abc" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn nearest_requires_exactly_one_input() {
        let server = MockServer::start().await;
        let (status, _) = send(&server, serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &server,
            serde_json::json!({ "address": QUERY, "postal_code": "30130010" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn nearest_malformed_json_is_validation_error() {
        let server = MockServer::start().await;
        let response = test_app(&server.uri())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/nearest")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn nearest_unknown_address_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let (status, json) = send(&server, serde_json::json!({ "address": QUERY })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn nearest_geocoder_outage_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (status, json) = send(&server, serde_json::json!({ "address": QUERY })).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["code"], "upstream_error");
    }

    #[tokio::test]
    async fn nearest_without_any_route_is_unprocessable() {
        let server = MockServer::start().await;
        mount_place(&server, "Rua da Bahia 1148 Centro Belo Horizonte", "-19.92", "-43.94").await;
        mount_stores(&server).await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "code": "Ok", "routes": [] })),
            )
            .mount(&server)
            .await;

        let (status, json) = send(&server, serde_json::json!({ "address": QUERY })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"], "unprocessable");
    }

    #[tokio::test]
    async fn nearest_by_postal_code_uses_looked_up_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/30140071/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cep": "30140-071",
                "logradouro": "Rua da Bahia",
                "bairro": "Centro",
                "localidade": "Belo Horizonte",
                "uf": "MG"
            })))
            .mount(&server)
            .await;
        mount_place(&server, "Rua da Bahia Centro Belo Horizonte MG", "-19.92", "-43.94").await;
        mount_stores(&server).await;
        mount_happy_routes(&server).await;

        let (status, json) = send(&server, serde_json::json!({ "postal_code": "30140-071" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json["data"]["query_address"],
            "Rua da Bahia, Centro, Belo Horizonte, MG"
        );
        assert_eq!(json["data"]["store"]["name"], "Savassi");
    }

    #[tokio::test]
    async fn nearest_unknown_postal_code_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ws/99999999/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "erro": true })))
            .mount(&server)
            .await;

        let (status, _) = send(&server, serde_json::json!({ "postal_code": "99999999" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nearest_malformed_postal_code_is_validation_error() {
        let server = MockServer::start().await;
        let (status, json) = send(&server, serde_json::json!({ "postal_code": "12-34" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn nearest_persists_success_to_query_log(pool: sqlx::PgPool) {
        let server = MockServer::start().await;
        mount_place(&server, "Rua da Bahia 1148 Centro Belo Horizonte", "-19.92", "-43.94").await;
        mount_stores(&server).await;
        mount_happy_routes(&server).await;

        let state = AppState::new(&test_config(&server.uri()), Some(pool.clone()), test_stores())
            .expect("state");
        let response = build_app(state, default_rate_limit_state())
            .oneshot(post_nearest(serde_json::json!({ "address": QUERY })))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let rows = nearstore_db::list_query_log(&pool, 10)
            .await
            .expect("list query log");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "success");
        assert_eq!(rows[0].query, QUERY);
    }
}
